//! User interaction seam
//!
//! The engine never talks to a terminal directly; it asks a [`Prompter`].
//! The terminal implementation lives here, tests script their own.

use async_trait::async_trait;
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};

/// Answer to "add this file to the manifest?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Add it now
    Confirm,
    /// Not now; ask again next time. Also the answer for a dismissed prompt.
    Defer,
    /// Never ask about this path again
    Suppress,
}

impl Choice {
    /// Parse a typed answer; `None` when the input names no choice
    pub fn from_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Choice::Confirm),
            "n" | "no" | "" => Some(Choice::Defer),
            "never" | "ignore" | "i" => Some(Choice::Suppress),
            _ => None,
        }
    }
}

/// Severity of a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Warning,
    Error,
}

#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask whether `subject` should be added to `manifest`
    async fn choose_add(&self, subject: &str, manifest: &str) -> Choice;

    /// Ask to confirm a removal; dismissal counts as no
    async fn confirm_removal(&self, message: &str) -> bool;

    /// Show a message without waiting for an answer
    fn notify(&self, notice: Notice, message: &str);
}

/// Prompts on stdin/stderr
pub struct TerminalPrompter {
    /// Answer yes to everything without reading stdin
    assume_yes: bool,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    async fn ask(&self, question: String) -> Option<String> {
        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            eprint!("{} ", question);
            let _ = std::io::stderr().flush();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line),
            }
        })
        .await
        .ok()
        .flatten()
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn choose_add(&self, subject: &str, manifest: &str) -> Choice {
        if self.assume_yes {
            return Choice::Confirm;
        }
        let question = format!(
            "{} is not in {}. Add it? [y]es / [n]o / [i]gnore:",
            subject.cyan(),
            manifest.bold()
        );
        loop {
            // End of input is a dismissed prompt
            let Some(answer) = self.ask(question.clone()).await else {
                return Choice::Defer;
            };
            match Choice::from_answer(&answer) {
                Some(choice) => return choice,
                None => eprintln!("{}", "Please answer y, n or i.".yellow()),
            }
        }
    }

    async fn confirm_removal(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let question = format!("{} [y/N]:", message.yellow());
        matches!(
            self.ask(question).await.as_deref().map(Choice::from_answer),
            Some(Some(Choice::Confirm))
        )
    }

    fn notify(&self, notice: Notice, message: &str) {
        match notice {
            Notice::Info => eprintln!("{} {}", "✓".green(), message),
            Notice::Warning => eprintln!("{} {}", "!".yellow(), message.yellow()),
            Notice::Error => eprintln!("{} {}", "✗".red(), message.red()),
        }
    }
}
