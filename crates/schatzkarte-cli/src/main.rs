//! meeting-widget CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use schatzkarte_cli::cli::{Cli, Command, ConfigAction};
use schatzkarte_cli::commands;
use schatzkarte_cli::commands::simulate::Faults;
use schatzkarte_cli::error::CliResult;
use schatzkarte_core::{TracingConfig, init_tracing};
use schatzkarte_widget::WidgetConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let (config, config_path) = match cli.config {
        Some(ref path) => (WidgetConfig::load_from(path)?, path.clone()),
        None => (WidgetConfig::load()?, WidgetConfig::default_path()),
    };

    match cli.command {
        Command::View { descriptor, at } => {
            commands::view::run(&config, &descriptor, at, cli.json)
        }
        Command::Simulate {
            descriptor,
            steps,
            at,
            fail_load,
            fail_hangup,
        } => {
            let faults = Faults {
                fail_load,
                fail_hangup,
            };
            commands::simulate::run(&config, &descriptor, at, &steps, faults, cli.json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
