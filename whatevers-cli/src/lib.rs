//! # whatevers-cli
//!
//! Command-line surface over the whatevers repository: argument parsing, config loading and
//! command execution. `main.rs` only wires these together.

pub mod cli;
pub mod commands;

pub use cli::{load_config, AppConfig, Cli, Commands};
pub use commands::execute;
