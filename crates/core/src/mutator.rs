//! Adding and removing item entries
//!
//! None of these functions touch the disk; call [`crate::persist`] once after
//! a batch of mutations.

use crate::document::{render_element, Element, ManifestDocument, CONTAINER, INCLUDE_ATTR};
use crate::error::Result;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

/// Item type used when the type map has neither the extension nor `*`
pub const DEFAULT_ITEM_TYPE: &str = "Content";

/// Key in the type map that applies to every extension
pub const WILDCARD: &str = "*";

/// True if any entry in any container includes exactly `include`, whatever its item type
pub fn has_entry(doc: &ManifestDocument, include: &str) -> bool {
    doc.entries().any(|entry| entry.include == include)
}

/// Append an entry to the last container, creating one when there is none.
///
/// Duplicates are not checked; call [`has_entry`] first.
pub fn add_entry(doc: &mut ManifestDocument, include: &str, item_type: &str) -> Result<()> {
    let nl = doc.line_ending().as_str();
    let indent = doc.indent();
    let entry = render_element(item_type, INCLUDE_ATTR, include);

    let edit = match doc.containers().last() {
        Some(container) => append_child(doc.source(), container, 1, &entry, nl, |d| {
            indent.at_depth(d)
        }),
        None => {
            let group = format!(
                "<{CONTAINER}>{nl}{}{entry}{nl}{}</{CONTAINER}>",
                indent.at_depth(2),
                indent.at_depth(1),
            );
            append_child(doc.source(), doc.root(), 0, &group, nl, |d| indent.at_depth(d))
        }
    };

    doc.splice(vec![edit])
}

/// Remove the entry for `include`, or every entry below it when
/// `match_directory_prefix` is set. Returns whether anything was removed.
///
/// Directory matching respects path boundaries: `dir` covers `dir\a.txt` and
/// `dir/b.txt` but not `dir2\c.txt`.
pub fn remove_entry(
    doc: &mut ManifestDocument,
    include: &str,
    match_directory_prefix: bool,
) -> Result<bool> {
    let matches = include_matcher(include, match_directory_prefix);
    let source = doc.source();
    let edits: Vec<(Range<usize>, String)> = doc
        .entries()
        .filter(|entry| matches(entry.include))
        .map(|entry| (removal_range(source, entry.element), String::new()))
        .collect();

    if edits.is_empty() {
        return Ok(false);
    }
    doc.splice(edits)?;
    Ok(true)
}

/// True if [`remove_entry`] with the same arguments would remove anything
pub fn covers_entry(doc: &ManifestDocument, include: &str, match_directory_prefix: bool) -> bool {
    let matches = include_matcher(include, match_directory_prefix);
    doc.entries().any(|entry| matches(entry.include))
}

fn include_matcher(include: &str, match_directory_prefix: bool) -> impl Fn(&str) -> bool + '_ {
    let prefix = include.trim_end_matches(['/', '\\']);
    move |candidate: &str| {
        if match_directory_prefix {
            candidate == prefix
                || candidate
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with(['/', '\\']))
        } else {
            candidate == include
        }
    }
}

/// Item type for a new entry: exact extension, then `*`, then [`DEFAULT_ITEM_TYPE`]
pub fn item_type_for_file(file_name: &str, type_map: &BTreeMap<String, String>) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| type_map.get(&format!(".{}", ext.to_string_lossy())))
        .or_else(|| type_map.get(WILDCARD))
        .cloned()
        .unwrap_or_else(|| DEFAULT_ITEM_TYPE.to_string())
}

/// Edit that places `markup` as the last child of `parent`.
///
/// `depth` is the nesting level of `parent`; its children sit one level deeper.
/// A last child on its own line lends its leading whitespace to the new one.
fn append_child(
    source: &str,
    parent: &Element,
    depth: usize,
    markup: &str,
    nl: &str,
    indent: impl Fn(usize) -> String,
) -> (Range<usize>, String) {
    let child_indent = parent
        .children()
        .last()
        .and_then(|child| line_indent(source, child.span().start))
        .map(str::to_string)
        .unwrap_or_else(|| indent(depth + 1));

    let Some(close) = parent.close_tag() else {
        // `<ItemGroup />` grows a body and a closing tag
        let open = parent.open_tag();
        let head = source[open.clone()]
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        let expanded = format!(
            "{head}>{nl}{child_indent}{markup}{nl}{}</{}>",
            indent(depth),
            parent.name()
        );
        return (open, expanded);
    };

    // Whitespace between the last child (or the open tag) and the closing tag
    let body_start = parent
        .children()
        .last()
        .map(|c| c.span().end)
        .unwrap_or(parent.open_tag().end);
    let trailing_start = source[..close.start]
        .trim_end_matches([' ', '\t', '\r', '\n'])
        .len()
        .max(body_start);
    let trailing = &source[trailing_start..close.start];

    if trailing.contains('\n') {
        // Keep the existing line break before the closing tag
        let at = trailing_start..trailing_start;
        (at, format!("{nl}{child_indent}{markup}"))
    } else {
        let at = close.start..close.start;
        (at, format!("{nl}{child_indent}{markup}{nl}{}", indent(depth)))
    }
}

/// Whitespace before `pos` when nothing else precedes it on its line
fn line_indent(source: &str, pos: usize) -> Option<&str> {
    let before = &source[..pos];
    let line_start = before.trim_end_matches([' ', '\t']).len();
    before[..line_start]
        .ends_with('\n')
        .then(|| &before[line_start..])
}

/// Range covering an element plus the indentation run that precedes it on its line
fn removal_range(source: &str, element: &Element) -> Range<usize> {
    let span = element.span();
    let before = &source[..span.start];
    let line_start = before.trim_end_matches([' ', '\t']).len();
    let prefix = &before[..line_start];

    let start = if prefix.ends_with("\r\n") {
        line_start - 2
    } else if prefix.ends_with('\n') {
        line_start - 1
    } else {
        line_start
    };
    start..span.end
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project>
    <PropertyGroup>
        <Name>demo</Name>
    </PropertyGroup>
    <ItemGroup>
        <Compile Include="first.cs" />
    </ItemGroup>
    <ItemGroup>
        <Content Include="dir1/file1.ext1" />
    </ItemGroup>
</Project>
"#;

    fn doc(text: &str) -> ManifestDocument {
        ManifestDocument::parse("/p/demo.csproj", text).unwrap()
    }

    #[test]
    fn test_add_appends_to_last_container() {
        let mut doc = doc(MANIFEST);
        add_entry(&mut doc, "dir1/file2.ext2", "Content").unwrap();

        let expected = MANIFEST.replace(
            "        <Content Include=\"dir1/file1.ext1\" />\n",
            "        <Content Include=\"dir1/file1.ext1\" />\n        <Content Include=\"dir1/file2.ext2\" />\n",
        );
        assert_eq!(doc.source(), expected);
        assert_eq!(doc.containers().last().unwrap().children().len(), 2);
    }

    #[test]
    fn test_duplicate_detection_ignores_item_type() {
        let mut doc = doc(MANIFEST);
        assert!(!has_entry(&doc, "a/b.txt"));

        add_entry(&mut doc, "a/b.txt", "Content").unwrap();
        assert!(has_entry(&doc, "a/b.txt"));

        add_entry(&mut doc, "a/b.txt", "TypeScriptCompile").unwrap();
        assert!(has_entry(&doc, "a/b.txt"));
        assert_eq!(doc.entries().filter(|e| e.include == "a/b.txt").count(), 2);
    }

    #[test]
    fn test_add_creates_container_when_missing() {
        let mut doc = doc("<Project>\r\n\t<PropertyGroup />\r\n</Project>\r\n");
        add_entry(&mut doc, "x.txt", "Content").unwrap();
        assert_eq!(
            doc.source(),
            "<Project>\r\n\t<PropertyGroup />\r\n\t<ItemGroup>\r\n\t\t<Content Include=\"x.txt\" />\r\n\t</ItemGroup>\r\n</Project>\r\n"
        );
    }

    #[test]
    fn test_add_expands_self_closing_container() {
        let mut doc = doc("<Project>\n  <ItemGroup Label=\"x\" />\n</Project>");
        add_entry(&mut doc, "y.txt", "None").unwrap();
        assert_eq!(
            doc.source(),
            "<Project>\n  <ItemGroup Label=\"x\">\n    <None Include=\"y.txt\" />\n  </ItemGroup>\n</Project>"
        );
    }

    #[test]
    fn test_add_keeps_flat_manifest_flat() {
        let text = "<Project>\n<ItemGroup>\n<Content Include=\"a.txt\" />\n</ItemGroup>\n</Project>\n";
        let mut doc = doc(text);
        add_entry(&mut doc, "b.txt", "Content").unwrap();
        assert_eq!(
            doc.source(),
            "<Project>\n<ItemGroup>\n<Content Include=\"a.txt\" />\n<Content Include=\"b.txt\" />\n</ItemGroup>\n</Project>\n"
        );
    }

    #[test]
    fn test_add_follows_sibling_indentation() {
        // Indent unit is detected as 2, but entries sit 6 deep
        let text = "<Project>\n  <ItemGroup>\n      <Content Include=\"a.txt\" />\n  </ItemGroup>\n</Project>";
        let mut doc = doc(text);
        add_entry(&mut doc, "b.txt", "Content").unwrap();
        assert!(doc
            .source()
            .contains("\n      <Content Include=\"a.txt\" />\n      <Content Include=\"b.txt\" />\n  </ItemGroup>"));
    }

    #[test]
    fn test_add_into_single_line_document() {
        let mut doc = doc("<Project><ItemGroup></ItemGroup></Project>");
        add_entry(&mut doc, "z.txt", "Content").unwrap();
        assert_eq!(
            doc.source(),
            "<Project><ItemGroup>\n    <Content Include=\"z.txt\" />\n  </ItemGroup></Project>"
        );
        assert!(has_entry(&doc, "z.txt"));
    }

    #[test]
    fn test_remove_exact_and_prefix() {
        let text = "<Project>\n  <ItemGroup>\n    <Content Include=\"dir/a.txt\" />\n    <Content Include=\"dir/b.txt\" />\n    <Content Include=\"dir2/c.txt\" />\n  </ItemGroup>\n</Project>\n";

        let mut exact = doc(text);
        assert!(remove_entry(&mut exact, "dir/a.txt", false).unwrap());
        assert!(!has_entry(&exact, "dir/a.txt"));
        assert!(has_entry(&exact, "dir/b.txt"));
        assert_eq!(
            exact.source(),
            "<Project>\n  <ItemGroup>\n    <Content Include=\"dir/b.txt\" />\n    <Content Include=\"dir2/c.txt\" />\n  </ItemGroup>\n</Project>\n"
        );

        let mut prefix = doc(text);
        assert!(remove_entry(&mut prefix, "dir", true).unwrap());
        let left: Vec<_> = prefix.entries().map(|e| e.include.to_string()).collect();
        assert_eq!(left, vec!["dir2/c.txt"]);
    }

    #[test]
    fn test_covers_entry_matches_removal() {
        let doc = doc("<Project><ItemGroup><Content Include=\"dir\\a.txt\" /></ItemGroup></Project>");
        assert!(covers_entry(&doc, "dir", true));
        assert!(!covers_entry(&doc, "dir", false));
        assert!(!covers_entry(&doc, "di", true));
        assert!(covers_entry(&doc, "dir\\a.txt", false));
    }

    #[test]
    fn test_remove_nothing_reports_false() {
        let mut doc = doc(MANIFEST);
        let before = doc.source().to_string();
        assert!(!remove_entry(&mut doc, "missing.txt", false).unwrap());
        assert!(!remove_entry(&mut doc, "dir", true).unwrap());
        assert_eq!(doc.source(), before);
    }

    #[test]
    fn test_remove_crlf_entry() {
        let mut doc = doc("<Project>\r\n  <ItemGroup>\r\n    <Content Include=\"a\\b.txt\" />\r\n    <Content Include=\"c.txt\" />\r\n  </ItemGroup>\r\n</Project>");
        assert!(remove_entry(&mut doc, "a", true).unwrap());
        assert_eq!(
            doc.source(),
            "<Project>\r\n  <ItemGroup>\r\n    <Content Include=\"c.txt\" />\r\n  </ItemGroup>\r\n</Project>"
        );
    }

    #[test]
    fn test_item_type_for_file() {
        let mut map = BTreeMap::new();
        assert_eq!(item_type_for_file("a.ts", &map), DEFAULT_ITEM_TYPE);

        map.insert("*".to_string(), "None".to_string());
        map.insert(".ts".to_string(), "TypeScriptCompile".to_string());
        assert_eq!(item_type_for_file("a.ts", &map), "TypeScriptCompile");
        assert_eq!(item_type_for_file("a.css", &map), "None");
        assert_eq!(item_type_for_file("Makefile", &map), "None");
    }
}
