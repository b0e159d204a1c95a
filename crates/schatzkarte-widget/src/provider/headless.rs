//! In-process provider that needs no browser.
//!
//! Commands are acknowledged immediately and every call is counted, which
//! makes it the adapter behind `meeting-widget simulate` and the controller
//! tests. Failure modes (blocked script, refused connection, throwing hangup)
//! can be switched on per instance.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use url::Url;

use super::{
    BoxFuture, ConferenceSdk, Connection, ConnectionOptions, ProviderCommand, ProviderEvent,
    ProviderEventSink, SdkFetcher,
};
use crate::config::SurfaceStyle;
use crate::error::{WidgetError, WidgetResult};

/// Switchable behaviour of the headless provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessBehavior {
    /// Fire `Joined` right after the surface mounts.
    pub auto_join: bool,
    /// Make `hangup` fail.
    pub fail_hangup: bool,
    /// Refuse to create connections.
    pub fail_create: bool,
}

impl Default for HeadlessBehavior {
    fn default() -> Self {
        Self {
            auto_join: true,
            fail_hangup: false,
            fail_create: false,
        }
    }
}

/// Call counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessStats {
    pub fetches: u32,
    pub purges: u32,
    pub connections_created: u32,
    pub connections_disposed: u32,
    pub hangups: u32,
    pub styles_applied: u32,
    pub last_options: Option<ConnectionOptions>,
    pub last_style: Option<SurfaceStyle>,
}

#[derive(Debug, Default)]
struct HeadlessInner {
    behavior: HeadlessBehavior,
    stats: HeadlessStats,
    latest_sink: Option<ProviderEventSink>,
}

/// Headless SDK handle. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSdk {
    inner: Arc<Mutex<HeadlessInner>>,
}

impl HeadlessSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: HeadlessBehavior) -> Self {
        let sdk = Self::default();
        sdk.lock().behavior = behavior;
        sdk
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a snapshot of the call counters.
    pub fn stats(&self) -> HeadlessStats {
        self.lock().stats.clone()
    }

    pub fn set_fail_hangup(&self, fail: bool) {
        self.lock().behavior.fail_hangup = fail;
    }

    /// Fires `event` on the most recently created connection.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        let sink = self.lock().latest_sink.clone();
        sink.is_some_and(|sink| sink.emit(event))
    }
}

impl ConferenceSdk for HeadlessSdk {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_connection(
        &self,
        options: ConnectionOptions,
        events: ProviderEventSink,
    ) -> WidgetResult<Box<dyn Connection>> {
        let auto_join = {
            let mut inner = self.lock();
            if inner.behavior.fail_create {
                return Err(WidgetError::connection_create("headless provider refused"));
            }
            inner.stats.connections_created += 1;
            inner.stats.last_options = Some(options);
            inner.latest_sink = Some(events.clone());
            inner.behavior.auto_join
        };

        events.emit(ProviderEvent::SurfaceMounted);
        if auto_join {
            events.emit(ProviderEvent::Joined);
        }

        Ok(Box::new(HeadlessConnection {
            sdk: self.clone(),
            events,
        }))
    }
}

struct HeadlessConnection {
    sdk: HeadlessSdk,
    events: ProviderEventSink,
}

impl Connection for HeadlessConnection {
    fn execute(&mut self, command: ProviderCommand) -> WidgetResult<()> {
        match command {
            ProviderCommand::Hangup => {
                let fail = {
                    let mut inner = self.sdk.lock();
                    inner.stats.hangups += 1;
                    inner.behavior.fail_hangup
                };
                if fail {
                    return Err(WidgetError::provider(command.as_str(), "iframe not reachable"));
                }
                self.events.emit(ProviderEvent::Left);
                self.events.emit(ProviderEvent::ReadyToClose);
                Ok(())
            }
        }
    }

    fn apply_surface_style(&mut self, style: &SurfaceStyle) {
        let mut inner = self.sdk.lock();
        inner.stats.styles_applied += 1;
        inner.stats.last_style = Some(style.clone());
    }

    fn dispose(&mut self) {
        self.sdk.lock().stats.connections_disposed += 1;
    }
}

/// Fetcher that "loads" a [`HeadlessSdk`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessFetcher {
    sdk: HeadlessSdk,
    failure: Option<String>,
    latency: Option<Duration>,
}

impl HeadlessFetcher {
    pub fn new(sdk: HeadlessSdk) -> Self {
        Self {
            sdk,
            failure: None,
            latency: None,
        }
    }

    /// Builder: make every fetch fail with `message`.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Builder: delay fetch completion.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

impl SdkFetcher for HeadlessFetcher {
    fn purge_stale_globals(&self) {
        self.sdk.lock().stats.purges += 1;
    }

    fn fetch(&self, script_url: Url) -> BoxFuture<'_, WidgetResult<Arc<dyn ConferenceSdk>>> {
        self.sdk.lock().stats.fetches += 1;
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            if let Some(ref message) = self.failure {
                return Err(WidgetError::sdk_load(format!("{script_url}: {message}")));
            }
            let sdk: Arc<dyn ConferenceSdk> = Arc::new(self.sdk.clone());
            Ok(sdk)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderSignal;
    use serde_json::Map;
    use tokio::sync::mpsc;

    fn options() -> ConnectionOptions {
        ConnectionOptions {
            room_name: "room".to_string(),
            jwt: None,
            display_name: "Mia".to_string(),
            parent_node_id: "surface".to_string(),
            config_overwrite: Map::new(),
            interface_config_overwrite: Map::new(),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ProviderSignal>) -> Vec<ProviderEvent> {
        let mut events = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            events.push(signal.event);
        }
        events
    }

    #[test]
    fn create_mounts_and_joins() {
        let sdk = HeadlessSdk::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _conn = sdk
            .create_connection(options(), ProviderEventSink::new(1, tx))
            .unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![ProviderEvent::SurfaceMounted, ProviderEvent::Joined]
        );
        assert_eq!(sdk.stats().connections_created, 1);
    }

    #[test]
    fn hangup_fires_left_and_ready_to_close() {
        let sdk = HeadlessSdk::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut conn = sdk
            .create_connection(options(), ProviderEventSink::new(1, tx))
            .unwrap();
        drain(&mut rx);

        conn.execute(ProviderCommand::Hangup).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![ProviderEvent::Left, ProviderEvent::ReadyToClose]
        );
    }

    #[test]
    fn failing_hangup() {
        let sdk = HeadlessSdk::with_behavior(HeadlessBehavior {
            fail_hangup: true,
            ..Default::default()
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut conn = sdk
            .create_connection(options(), ProviderEventSink::new(1, tx))
            .unwrap();

        let err = conn.execute(ProviderCommand::Hangup).unwrap_err();
        assert!(matches!(err, WidgetError::Provider { .. }));
        assert_eq!(sdk.stats().hangups, 1);
    }

    #[tokio::test]
    async fn fetcher_failure() {
        let fetcher = HeadlessFetcher::new(HeadlessSdk::new()).with_failure("blocked");
        let url = Url::parse("https://8x8.vc/external_api.js").unwrap();
        let result = fetcher.fetch(url).await;
        assert!(matches!(result, Err(WidgetError::SdkLoad { .. })));
    }
}
