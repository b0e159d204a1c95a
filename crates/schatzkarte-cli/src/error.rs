//! CLI error types.

use std::path::PathBuf;

use schatzkarte_widget::WidgetError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end a `meeting-widget` invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// Widget or configuration error.
    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// The descriptor file could not be read or parsed.
    #[error("invalid descriptor {}: {message}", path.display())]
    Descriptor { path: PathBuf, message: String },
}

impl CliError {
    pub fn descriptor(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Descriptor {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Widget(WidgetError::Json(err))
    }
}
