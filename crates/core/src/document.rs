//! Parsed, lossless representation of one manifest file
//!
//! The document keeps the exact source text next to an element tree indexed
//! by byte spans into that text. Structural edits splice the text and re-index,
//! so everything the engine does not touch is written back byte-for-byte.

use crate::error::{Result, SyncError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

/// Element name of an item container
pub const CONTAINER: &str = "ItemGroup";

/// Attribute carrying an item entry's path
pub const INCLUDE_ATTR: &str = "Include";

const UTF8_BOM: &str = "\u{feff}";

/// Indentation unit used when generating new lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    Spaces(usize),
    Tab,
}

impl Indent {
    pub const DEFAULT: Indent = Indent::Spaces(2);

    /// Detect the unit from the first indented, non-blank line
    pub fn detect(source: &str) -> Self {
        for line in source.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with('\t') {
                return Indent::Tab;
            }
            let spaces = line.len() - line.trim_start_matches(' ').len();
            if spaces > 0 {
                return Indent::Spaces(spaces);
            }
        }
        Self::DEFAULT
    }

    /// Whitespace for `depth` levels of nesting
    pub fn at_depth(&self, depth: usize) -> String {
        match self {
            Indent::Spaces(width) => " ".repeat(width * depth),
            Indent::Tab => "\t".repeat(depth),
        }
    }
}

/// Line terminator used by the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(source: &str) -> Self {
        if source.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// One element of the manifest tree
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    /// Whole element including its closing tag
    span: Range<usize>,
    open_tag: Range<usize>,
    /// `None` for self-closing elements
    close_tag: Option<Range<usize>>,
    children: Vec<Element>,
}

impl Element {
    fn open(tag: &BytesStart<'_>, open_tag: Range<usize>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in tag.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = std::str::from_utf8(&attr.value).map_err(|e| e.to_string())?;
            let value = quick_xml::escape::unescape(raw).map_err(|e| e.to_string())?;
            attributes.push((key, value.into_owned()));
        }

        Ok(Self {
            name,
            attributes,
            span: open_tag.clone(),
            open_tag,
            close_tag: None,
            children: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unescaped value of an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn open_tag(&self) -> Range<usize> {
        self.open_tag.clone()
    }

    pub fn close_tag(&self) -> Option<Range<usize>> {
        self.close_tag.clone()
    }

    /// Include path when this element is an item entry
    pub fn include(&self) -> Option<&str> {
        self.attribute(INCLUDE_ATTR)
    }
}

/// An item entry as seen through the tree
#[derive(Debug, Clone, Copy)]
pub struct ItemEntry<'a> {
    pub item_type: &'a str,
    pub include: &'a str,
    pub element: &'a Element,
}

/// In-memory manifest, identified by its absolute path
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    path: PathBuf,
    source: String,
    bom: bool,
    root: Element,
    indent: Indent,
    line_ending: LineEnding,
}

impl ManifestDocument {
    /// Parse manifest text read from `path`, stripping any byte-order mark
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let (bom, source) = match text.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest.to_string()),
            None => (false, text.to_string()),
        };
        let root = parse_tree(&path, &source)?;
        let indent = Indent::detect(&source);
        let line_ending = LineEnding::detect(&source);

        Ok(Self {
            path,
            source,
            bom,
            root,
            indent,
            line_ending,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory include paths are relative to
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// File name of the manifest, for messages
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn indent(&self) -> Indent {
        self.indent
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Root-level item containers, in document order
    pub fn containers(&self) -> impl Iterator<Item = &Element> {
        self.root.children.iter().filter(|c| c.name == CONTAINER)
    }

    /// Every item entry under every container
    pub fn entries(&self) -> impl Iterator<Item = ItemEntry<'_>> {
        self.containers().flat_map(|container| {
            container.children.iter().filter_map(|element| {
                element.include().map(|include| ItemEntry {
                    item_type: element.name(),
                    include,
                    element,
                })
            })
        })
    }

    /// Separator used by existing include paths, `\` when there are none
    pub fn separator(&self) -> char {
        for entry in self.entries() {
            if entry.include.contains('\\') {
                return '\\';
            }
            if entry.include.contains('/') {
                return '/';
            }
        }
        '\\'
    }

    /// Include path for an absolute file path, in the manifest's own form
    pub fn relative_include(&self, file: &Path) -> Result<String> {
        let rel = file
            .strip_prefix(self.dir())
            .map_err(|_| SyncError::OutsideManifest {
                file: file.to_path_buf(),
                manifest_dir: self.dir().to_path_buf(),
            })?;

        let separator = self.separator().to_string();
        let parts: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Ok(parts.join(&separator))
    }

    /// Serialized file content, byte-order mark included when the source had one
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.source.len() + UTF8_BOM.len());
        if self.bom {
            out.extend_from_slice(UTF8_BOM.as_bytes());
        }
        out.extend_from_slice(self.source.as_bytes());
        out
    }

    /// Apply non-overlapping text replacements and re-index the tree.
    ///
    /// Either every edit lands or the document is left untouched.
    pub(crate) fn splice(&mut self, mut edits: Vec<(Range<usize>, String)>) -> Result<()> {
        if edits.is_empty() {
            return Ok(());
        }
        edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut source = self.source.clone();
        for (range, text) in edits {
            source.replace_range(range, &text);
        }
        let root = parse_tree(&self.path, &source)?;

        self.source = source;
        self.root = root;
        Ok(())
    }
}

/// Render a new self-closing element with one attribute.
///
/// Escaped line breaks are turned back into literal characters; the manifest
/// format expects them verbatim inside attribute text.
pub fn render_element(name: &str, attr: &str, value: &str) -> String {
    let escaped = quick_xml::escape::escape(value);
    format!("<{} {}=\"{}\" />", name, attr, unescape_line_breaks(&escaped))
}

/// Replace character references for CR and LF with the literal characters
pub fn unescape_line_breaks(text: &str) -> String {
    text.replace("&#xD;", "\r")
        .replace("&#xd;", "\r")
        .replace("&#13;", "\r")
        .replace("&#xA;", "\n")
        .replace("&#xa;", "\n")
        .replace("&#10;", "\n")
}

fn parse_tree(path: &Path, source: &str) -> Result<Element> {
    let parse_error = |offset: usize, message: String| SyncError::ManifestParse {
        path: path.to_path_buf(),
        offset,
        message,
    };

    let mut reader = Reader::from_str(source);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| parse_error(start, e.to_string()))?;
        let end = reader.buffer_position() as usize;

        let finished = match event {
            Event::Start(tag) => {
                let start = tag_start(source, start);
                let element = Element::open(&tag, start..end).map_err(|m| parse_error(start, m))?;
                stack.push(element);
                None
            }
            Event::Empty(tag) => {
                let start = tag_start(source, start);
                Some(Element::open(&tag, start..end).map_err(|m| parse_error(start, m))?)
            }
            Event::End(tag) => {
                let start = tag_start(source, start);
                let mut element = stack.pop().ok_or_else(|| {
                    parse_error(
                        start,
                        format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(tag.name().as_ref())
                        ),
                    )
                })?;
                element.close_tag = Some(start..end);
                element.span = element.open_tag.start..end;
                Some(element)
            }
            Event::Text(text) => {
                if stack.is_empty() && !text.iter().all(|b| b.is_ascii_whitespace()) {
                    return Err(parse_error(start, "text outside the root element".into()));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(element) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None if root.is_none() => root = Some(element),
                None => return Err(parse_error(start, "multiple root elements".into())),
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(parse_error(
            source.len(),
            format!("unclosed element <{}>", open.name),
        ));
    }
    root.ok_or_else(|| parse_error(0, "no root element".into()))
}

/// Offset of the `<` opening a tag whose read began at `pos`.
///
/// The reader may already have consumed the `<` while scanning the text before it.
fn tag_start(source: &str, pos: usize) -> usize {
    let bytes = source.as_bytes();
    if bytes.get(pos) != Some(&b'<') && pos > 0 && bytes[pos - 1] == b'<' {
        pos - 1
    } else {
        pos
    }
}
