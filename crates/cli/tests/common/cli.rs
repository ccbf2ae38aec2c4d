//! Runs the `csync` binary built for this test run
//!
//! Every command gets its own config file location so tests never read the
//! developer's config.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

pub struct CsyncCommand {
    command: Command,
    args: Vec<String>,
    stdin: Option<String>,
}

impl CsyncCommand {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        let mut command = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_csync")));
        command.current_dir(working_dir).env_remove("RUST_LOG");
        Self {
            command,
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.command.args(args);
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.command.env(key, value);
        self
    }

    /// Answers fed to the prompts
    pub fn stdin(&mut self, data: &str) -> &mut Self {
        self.stdin = Some(data.to_string());
        self
    }

    fn run(&mut self) -> Result<CommandResult> {
        let output: Output = match &self.stdin {
            Some(answers) => {
                let mut child = self
                    .command
                    .stdin(Stdio::piped())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()
                    .context("Failed to spawn csync")?;
                if let Some(mut pipe) = child.stdin.take() {
                    pipe.write_all(answers.as_bytes())?;
                }
                child.wait_with_output().context("Failed to wait for csync")?
            }
            None => self.command.output().context("Failed to run csync")?,
        };

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    pub fn assert_success(&mut self) -> Result<CommandResult> {
        let result = self.run()?;
        if result.exit_code != 0 {
            anyhow::bail!(
                "csync {:?} exited with {}\nstdout: {}\nstderr: {}",
                self.args,
                result.exit_code,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    pub fn assert_failure(&mut self) -> Result<CommandResult> {
        let result = self.run()?;
        if result.exit_code == 0 {
            anyhow::bail!("csync {:?} should have failed\nstdout: {}", self.args, result.stdout);
        }
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}
