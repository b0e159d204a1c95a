//! Conferencing provider adapter.
//!
//! The provider SDK is an opaque black box: a script is loaded, a connection
//! is instantiated with options, named events come back, named commands go
//! out. These traits are the only surface the controller sees, so the state
//! machine runs the same against a browser binding or [`headless`].
//!
//! Providers are responsible for:
//! - Loading their client library ([`SdkFetcher`])
//! - Creating connections bound to a mount point ([`ConferenceSdk`])
//! - Executing commands and tearing down ([`Connection`])
//! - Reporting lifecycle events through a [`ProviderEventSink`]

pub mod headless;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use url::Url;

use crate::config::SurfaceStyle;
use crate::error::WidgetResult;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lifecycle events fired by a provider connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    /// The provider's iframe/surface is mounted.
    SurfaceMounted,
    /// The local participant joined the conference.
    Joined,
    /// The local participant left. Also fired spuriously on some re-layouts.
    Left,
    /// The provider is ready to be disposed. Same caveat as `Left`.
    ReadyToClose,
}

/// Named commands sent to a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCommand {
    Hangup,
}

impl ProviderCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hangup => "hangup",
        }
    }
}

/// An event tagged with the connection generation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSignal {
    pub generation: u64,
    pub event: ProviderEvent,
}

/// Sender half handed to a connection at creation time.
#[derive(Debug, Clone)]
pub struct ProviderEventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<ProviderSignal>,
}

impl ProviderEventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<ProviderSignal>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Delivers an event. Returns false if the widget is gone.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        self.tx
            .send(ProviderSignal {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Everything the provider needs to instantiate a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionOptions {
    pub room_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
    pub display_name: String,
    pub parent_node_id: String,
    pub config_overwrite: Map<String, Value>,
    pub interface_config_overwrite: Map<String, Value>,
}

/// A live provider connection, exclusively owned by one widget.
pub trait Connection: Send {
    /// Executes a named command.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::Provider` if the provider rejects or throws.
    fn execute(&mut self, command: ProviderCommand) -> WidgetResult<()>;

    /// Re-applies mandatory styling to the embedded surface.
    fn apply_surface_style(&mut self, style: &SurfaceStyle);

    /// Tears the connection down. Called exactly once.
    fn dispose(&mut self);
}

/// A loaded provider client library.
pub trait ConferenceSdk: Send + Sync {
    /// Returns the provider name (e.g., "jitsi", "headless").
    fn name(&self) -> &str;

    /// Instantiates a connection that reports through `events`.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::ConnectionCreate` if the provider refuses.
    fn create_connection(
        &self,
        options: ConnectionOptions,
        events: ProviderEventSink,
    ) -> WidgetResult<Box<dyn Connection>>;
}

/// Fetches the provider client library.
pub trait SdkFetcher: Send + Sync {
    /// Drops global references left behind by an earlier session.
    fn purge_stale_globals(&self);

    /// Loads the library from `script_url`.
    ///
    /// # Errors
    ///
    /// Returns `WidgetError::SdkLoad` on network errors or blocked scripts.
    fn fetch(&self, script_url: Url) -> BoxFuture<'_, WidgetResult<Arc<dyn ConferenceSdk>>>;
}
