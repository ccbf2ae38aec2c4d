//! CLI command implementations

pub mod add;
pub mod config;
pub mod ignore;
pub mod remove;
pub mod status;
pub mod watch;
