//! csync command-line front end
//!
//! The [`engine::Engine`] owns synchronization state and is driven either by
//! one-shot commands or by the watch loop in [`daemon`].

pub mod cmd;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod locks;
pub mod logging;
pub mod prompt;
pub mod util;

pub use engine::{BatchOutcome, Engine, Tracking};
pub use prompt::{Choice, Notice, Prompter, TerminalPrompter};
