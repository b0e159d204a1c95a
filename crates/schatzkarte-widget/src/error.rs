//! Widget error types.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type for widget operations.
pub type WidgetResult<T> = Result<T, WidgetError>;

/// Errors that can occur inside the widget or at its provider boundary.
///
/// None of these reach the host page: the controller converts them into
/// local state changes and logs them.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// The provider client library could not be loaded.
    #[error("failed to load conferencing SDK: {message}")]
    SdkLoad { message: String },

    /// A provider command failed.
    #[error("provider command '{command}' failed: {message}")]
    Provider { command: String, message: String },

    /// The provider refused to create a connection.
    #[error("failed to create connection: {message}")]
    ConnectionCreate { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// IO error (config file, descriptor file).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Config file could not be parsed.
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON (de)serialisation failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A scripted simulation step could not be parsed.
    #[error("invalid step '{step}': {message}")]
    InvalidStep { step: String, message: String },
}

impl WidgetError {
    /// Creates an SDK load error.
    pub fn sdk_load(message: impl Into<String>) -> Self {
        Self::SdkLoad {
            message: message.into(),
        }
    }

    /// Creates a provider command error.
    pub fn provider(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Creates a connection creation error.
    pub fn connection_create(message: impl Into<String>) -> Self {
        Self::ConnectionCreate {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid step error.
    pub fn invalid_step(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStep {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// A load failure shared by every caller waiting on the same SDK load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LoadFailure {
    message: Arc<str>,
}

impl LoadFailure {
    pub fn new(message: impl AsRef<str>) -> Self {
        Self {
            message: Arc::from(message.as_ref()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<WidgetError> for LoadFailure {
    fn from(err: WidgetError) -> Self {
        Self::new(err.to_string())
    }
}
