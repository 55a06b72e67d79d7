//! Plain-text rendering of sync state, and the `cli` binary's commands.

pub mod format;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub use cli::{Cli, Command, entrypoint, init_logging, run};
