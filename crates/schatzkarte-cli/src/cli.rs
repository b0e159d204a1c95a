//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// meeting-widget - inspect and simulate the floating meeting widget
#[derive(Debug, Parser)]
#[command(name = "meeting-widget")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SCHATZKARTE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show what the widget renders for a descriptor
    View {
        /// Descriptor JSON file
        descriptor: PathBuf,

        /// Evaluate the descriptor's schedule at this instant (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Run scripted steps against the headless provider
    ///
    /// Steps: join, toggle, minimize, restore, leave, tick, force-join,
    /// unmount, drag:DX,DY, resize:DX,DY, viewport:WxH
    Simulate {
        /// Descriptor JSON file
        descriptor: PathBuf,

        /// Steps to run in order
        #[arg(required = true)]
        steps: Vec<String>,

        /// Evaluate the descriptor's schedule at this instant (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Make the SDK load fail with this message
        #[arg(long)]
        fail_load: Option<String>,

        /// Make the provider's hangup fail
        #[arg(long)]
        fail_hangup: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
