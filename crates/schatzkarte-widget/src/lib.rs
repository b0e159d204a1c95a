//! Floating meeting widget controller.
//!
//! [`MeetingWidget`] owns the view state machine and the single provider
//! connection of one widget instance. [`WidgetRuntime`] drives it from a
//! tokio task, multiplexing user commands, provider events, the pending SDK
//! load and the waiting countdown.

pub mod config;
pub mod controller;
pub mod countdown;
pub mod error;
pub mod frame;
pub mod loader;
pub mod provider;
pub mod runtime;
pub mod state;

pub use config::WidgetConfig;
pub use controller::{ActionCallback, MeetingWidget, VideoLayout, WidgetView};
pub use error::{LoadFailure, WidgetError, WidgetResult};
pub use loader::{PendingLoad, SdkLoader};
pub use provider::{
    ConferenceSdk, Connection, ConnectionOptions, ProviderCommand, ProviderEvent,
    ProviderEventSink, ProviderSignal, SdkFetcher,
};
pub use runtime::{WidgetCommand, WidgetHandle, WidgetRuntime, WidgetSnapshot};
pub use state::{ViewTrigger, WidgetMode, WidgetViewState};
