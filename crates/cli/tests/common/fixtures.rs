//! Workspace fixtures and test doubles

use super::cli::CsyncCommand;
use async_trait::async_trait;
use cli_lib::{Choice, Notice, Prompter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const MANIFEST: &str = "<Project Sdk=\"Microsoft.NET.Sdk\">\n  <ItemGroup>\n    <Content Include=\"existing.txt\" />\n  </ItemGroup>\n</Project>\n";

/// A temporary project with one manifest and an isolated config location
pub struct TestWorkspace {
    _dir: TempDir,
    _config_dir: TempDir,
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub config_path: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self::with_manifest(MANIFEST)
    }

    pub fn with_manifest(content: &str) -> Self {
        let dir = TempDir::new().expect("create workspace");
        let config_dir = TempDir::new().expect("create config dir");
        let root = dir.path().canonicalize().expect("canonical root");
        let manifest = root.join("app.csproj");
        fs::write(&manifest, content).expect("write manifest");
        fs::write(root.join("existing.txt"), "tracked").expect("write tracked file");

        Self {
            config_path: config_dir.path().join("config.toml"),
            _dir: dir,
            _config_dir: config_dir,
            root,
            manifest,
        }
    }

    /// Create a file (and its parents) below the root
    pub fn file(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create parent");
        fs::write(&path, "content").expect("write file");
        path
    }

    pub fn manifest_text(&self) -> String {
        fs::read_to_string(&self.manifest).expect("read manifest")
    }

    pub fn ignore_list_path(&self) -> PathBuf {
        cli_lib::config::ignore_list_path(&self.root)
    }

    /// `csync <args>` run from the workspace root
    pub fn csync(&self, args: &[&str]) -> CsyncCommand {
        let mut cmd = CsyncCommand::new(&self.root);
        cmd.args(args)
            .env(cli_lib::config::CONFIG_ENV, &self.config_path.to_string_lossy());
        cmd
    }
}

/// Answers from a script and records everything it was asked
#[derive(Default)]
pub struct ScriptedPrompter {
    choices: Mutex<VecDeque<Choice>>,
    confirms: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
    notices: Mutex<Vec<(Notice, String)>>,
}

impl ScriptedPrompter {
    pub fn new(choices: &[Choice], confirms: &[bool]) -> Arc<Self> {
        let prompter = Self::default();
        prompter.choices.lock().extend(choices.iter().copied());
        prompter.confirms.lock().extend(confirms.iter().copied());
        Arc::new(prompter)
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub fn notices(&self) -> Vec<(Notice, String)> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn choose_add(&self, subject: &str, manifest: &str) -> Choice {
        self.asked.lock().push(format!("add {} to {}", subject, manifest));
        self.choices.lock().pop_front().unwrap_or(Choice::Defer)
    }

    async fn confirm_removal(&self, message: &str) -> bool {
        self.asked.lock().push(message.to_string());
        self.confirms.lock().pop_front().unwrap_or(false)
    }

    fn notify(&self, notice: Notice, message: &str) {
        self.notices.lock().push((notice, message.to_string()));
    }
}
