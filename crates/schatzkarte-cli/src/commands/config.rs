//! Configuration commands.

use std::path::Path;

use schatzkarte_widget::{WidgetConfig, WidgetError};

use crate::error::CliResult;

/// Dump the effective configuration, loaded from `path`, to stdout.
pub fn dump(config: &WidgetConfig, path: &Path) -> CliResult<()> {
    println!("{}", render(config, path)?);
    Ok(())
}

fn render(config: &WidgetConfig, path: &Path) -> CliResult<String> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| WidgetError::config(format!("failed to serialize config: {e}")))?;
    Ok(format!("# widget.toml ({})\n{toml_str}", path.display()))
}

/// Validate the configuration.
pub fn validate(config: &WidgetConfig) -> CliResult<()> {
    config.validate()?;
    config.provider.script_url(None)?;
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path in effect.
pub fn path(path: &Path) -> CliResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_dumps_and_validates() {
        assert!(dump(&WidgetConfig::default(), &WidgetConfig::default_path()).is_ok());
        assert!(validate(&WidgetConfig::default()).is_ok());
    }

    #[test]
    fn dump_names_the_selected_file() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("kiosk.toml");
        let rendered = render(&WidgetConfig::default(), &custom).unwrap();
        let header = rendered.lines().next().unwrap();
        assert_eq!(header, format!("# widget.toml ({})", custom.display()));
    }

    #[test]
    fn broken_config_is_rejected() {
        let config = WidgetConfig::default().with_tick_secs(0);
        assert!(validate(&config).is_err());
    }
}
