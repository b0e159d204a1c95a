//! Subcommand implementations.

pub mod config;
pub mod simulate;
pub mod view;

use std::sync::{Arc, Mutex, PoisonError};

use schatzkarte_core::{MeetingAction, MeetingDescriptor};
use schatzkarte_widget::provider::headless::{HeadlessFetcher, HeadlessSdk};
use schatzkarte_widget::{MeetingWidget, SdkLoader, WidgetConfig};

/// Host actions recorded by a CLI-driven widget.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    inner: Arc<Mutex<Vec<MeetingAction>>>,
}

impl ActionLog {
    fn record(&self, action: MeetingAction) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<MeetingAction> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Builds a widget backed by the headless provider.
pub fn headless_widget(
    descriptor: MeetingDescriptor,
    config: WidgetConfig,
    fetcher: HeadlessFetcher,
) -> (MeetingWidget, ActionLog) {
    let log = ActionLog::default();
    let recorder = log.clone();
    let widget = MeetingWidget::new(
        descriptor,
        config,
        Arc::new(SdkLoader::new(Arc::new(fetcher))),
        Arc::new(move |action| recorder.record(action)),
    );
    (widget, log)
}

/// Headless fetcher for a fresh SDK, optionally failing every load.
pub fn headless_fetcher(sdk: &HeadlessSdk, fail_load: Option<&str>) -> HeadlessFetcher {
    let fetcher = HeadlessFetcher::new(sdk.clone());
    match fail_load {
        Some(message) => fetcher.with_failure(message),
        None => fetcher,
    }
}
