//! splfacts CLI library.
//!
//! Command-line front end for the label extraction crates: configuration
//! loading, command execution, the interactive matcher and output
//! formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod repl;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
