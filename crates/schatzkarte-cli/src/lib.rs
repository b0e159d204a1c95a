//! `meeting-widget` command-line interface.
//!
//! Renders and simulates the floating meeting widget against the headless
//! provider, and manages the widget configuration file.

pub mod cli;
pub mod commands;
pub mod descriptor;
pub mod error;

pub use cli::Cli;
pub use error::{CliError, CliResult};
