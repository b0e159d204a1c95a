//! Async driver for a [`MeetingWidget`].
//!
//! The runtime owns the widget inside one tokio task and multiplexes:
//! - Host commands arriving through a [`WidgetHandle`]
//! - Provider events from the live connection
//! - The in-flight SDK load
//! - The one-minute countdown ticker, which only exists while waiting
//!
//! After every input the current [`WidgetSnapshot`] is published on a watch
//! channel for the host to render.

use std::future;
use std::time::Duration;

use schatzkarte_core::{MeetingDescriptor, Point, Viewport};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::controller::{MeetingWidget, WidgetView};
use crate::loader::{LoadOutcome, PendingLoad};
use crate::provider::ProviderSignal;
use crate::state::WidgetViewState;

/// Commands a host can send to a running widget.
#[derive(Debug, Clone)]
pub enum WidgetCommand {
    Join,
    ToggleSize,
    Minimize,
    Restore,
    Leave,
    /// Sets the host's force-join flag.
    ForceJoin(bool),
    /// Fresher meeting metadata from the host.
    UpdateDescriptor(Box<MeetingDescriptor>),
    Viewport(Viewport),
    PointerDownTitle { pointer: Point, over_control: bool },
    PointerDownResize { pointer: Point },
    PointerMove { pointer: Point },
    PointerUp,
    /// Tear down and stop the runtime.
    Unmount,
}

/// What the host renders, published after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub view: WidgetView,
    pub state: WidgetViewState,
}

impl WidgetSnapshot {
    fn of(widget: &MeetingWidget) -> Self {
        Self {
            view: widget.view(),
            state: widget.state().clone(),
        }
    }
}

type SendResult = Result<(), mpsc::error::SendError<WidgetCommand>>;

/// Runs a widget until it is unmounted or every handle is dropped.
pub struct WidgetRuntime {
    widget: MeetingWidget,
    command_tx: mpsc::Sender<WidgetCommand>,
    command_rx: mpsc::Receiver<WidgetCommand>,
    snapshot_tx: watch::Sender<WidgetSnapshot>,
}

impl WidgetRuntime {
    pub fn new(widget: MeetingWidget) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (snapshot_tx, _) = watch::channel(WidgetSnapshot::of(&widget));
        Self {
            widget,
            command_tx,
            command_rx,
            snapshot_tx,
        }
    }

    /// Returns a handle for sending commands and observing snapshots.
    pub fn handle(&self) -> WidgetHandle {
        WidgetHandle {
            command_tx: self.command_tx.clone(),
            snapshot_rx: self.snapshot_tx.subscribe(),
        }
    }

    /// Runs the event loop. Returns the unmounted widget.
    pub async fn run(self) -> MeetingWidget {
        let Self {
            mut widget,
            command_tx,
            mut command_rx,
            snapshot_tx,
        } = self;
        // From here on only handles keep the command channel open.
        drop(command_tx);

        let mut signals = widget.take_provider_signals();
        let mut pending: Option<PendingLoad> = None;
        let mut ticker = Ticker::new(widget.config().countdown.tick_period());

        info!(
            meeting_id = %widget.descriptor().meeting_id,
            mode = %widget.mode(),
            "Widget runtime started"
        );

        loop {
            if let Some(load) = widget.take_pending_load() {
                pending = Some(load);
            }
            ticker.sync(widget.countdown_active(), widget.countdown_epoch());
            publish(&snapshot_tx, &widget);

            if !widget.is_mounted() {
                break;
            }

            tokio::select! {
                cmd = command_rx.recv() => match cmd {
                    Some(cmd) => apply(&mut widget, cmd),
                    None => {
                        debug!("All widget handles dropped");
                        widget.unmount();
                    }
                },
                signal = next_signal(&mut signals) => {
                    if let Some(signal) = signal {
                        widget.handle_provider_signal(signal);
                    }
                }
                outcome = next_load(&mut pending) => {
                    pending = None;
                    widget.complete_load(outcome);
                }
                _ = ticker.tick() => {
                    widget.countdown_tick();
                }
            }
        }

        info!(meeting_id = %widget.descriptor().meeting_id, "Widget runtime stopped");
        widget
    }
}

fn apply(widget: &mut MeetingWidget, cmd: WidgetCommand) {
    debug!(command = ?cmd, "Received widget command");
    match cmd {
        WidgetCommand::Join => {
            widget.click_join();
        }
        WidgetCommand::ToggleSize => {
            widget.toggle_size();
        }
        WidgetCommand::Minimize => {
            widget.minimize();
        }
        WidgetCommand::Restore => {
            widget.restore();
        }
        WidgetCommand::Leave => {
            widget.request_leave();
        }
        WidgetCommand::ForceJoin(force) => widget.set_force_join(force),
        WidgetCommand::UpdateDescriptor(descriptor) => widget.update_descriptor(*descriptor),
        WidgetCommand::Viewport(viewport) => widget.set_viewport(viewport),
        WidgetCommand::PointerDownTitle {
            pointer,
            over_control,
        } => {
            widget.pointer_down_title(pointer, over_control);
        }
        WidgetCommand::PointerDownResize { pointer } => {
            widget.pointer_down_resize(pointer);
        }
        WidgetCommand::PointerMove { pointer } => {
            widget.pointer_move(pointer);
        }
        WidgetCommand::PointerUp => {
            widget.pointer_up();
        }
        WidgetCommand::Unmount => widget.unmount(),
    }
}

fn publish(snapshot_tx: &watch::Sender<WidgetSnapshot>, widget: &MeetingWidget) {
    let next = WidgetSnapshot::of(widget);
    snapshot_tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

/// The minute ticker, present only while a countdown runs.
///
/// A new countdown epoch restarts the interval so the first tick lands one
/// full period after the countdown (re)started.
struct Ticker {
    period: Duration,
    interval: Option<(u64, Interval)>,
}

impl Ticker {
    fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    fn sync(&mut self, active: bool, epoch: u64) {
        let current = self.interval.as_ref().map(|(epoch, _)| *epoch);
        match (active, current) {
            (true, Some(current)) if current == epoch => {}
            (true, previous) => {
                let mut interval =
                    tokio::time::interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.interval = Some((epoch, interval));
                debug!(
                    period_secs = self.period.as_secs(),
                    epoch,
                    restarted = previous.is_some(),
                    "Countdown ticker started"
                );
            }
            (false, Some(_)) => {
                self.interval = None;
                debug!("Countdown ticker stopped");
            }
            (false, None) => {}
        }
    }

    async fn tick(&mut self) {
        match &mut self.interval {
            Some((_, interval)) => {
                interval.tick().await;
            }
            None => future::pending().await,
        }
    }
}

async fn next_signal(
    signals: &mut Option<mpsc::UnboundedReceiver<ProviderSignal>>,
) -> Option<ProviderSignal> {
    match signals {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

async fn next_load(pending: &mut Option<PendingLoad>) -> LoadOutcome {
    match pending {
        Some(load) => load.await,
        None => future::pending().await,
    }
}

/// Handle for driving a running widget.
#[derive(Clone, Debug)]
pub struct WidgetHandle {
    command_tx: mpsc::Sender<WidgetCommand>,
    snapshot_rx: watch::Receiver<WidgetSnapshot>,
}

impl WidgetHandle {
    /// Sends any command.
    pub async fn send(&self, cmd: WidgetCommand) -> SendResult {
        self.command_tx.send(cmd).await
    }

    pub async fn join(&self) -> SendResult {
        self.send(WidgetCommand::Join).await
    }

    pub async fn toggle_size(&self) -> SendResult {
        self.send(WidgetCommand::ToggleSize).await
    }

    pub async fn minimize(&self) -> SendResult {
        self.send(WidgetCommand::Minimize).await
    }

    pub async fn restore(&self) -> SendResult {
        self.send(WidgetCommand::Restore).await
    }

    pub async fn leave(&self) -> SendResult {
        self.send(WidgetCommand::Leave).await
    }

    pub async fn force_join(&self, force: bool) -> SendResult {
        self.send(WidgetCommand::ForceJoin(force)).await
    }

    pub async fn update_descriptor(&self, descriptor: MeetingDescriptor) -> SendResult {
        self.send(WidgetCommand::UpdateDescriptor(Box::new(descriptor)))
            .await
    }

    pub async fn set_viewport(&self, viewport: Viewport) -> SendResult {
        self.send(WidgetCommand::Viewport(viewport)).await
    }

    /// Unmounts the widget; the runtime stops afterwards.
    pub async fn unmount(&self) -> SendResult {
        self.send(WidgetCommand::Unmount).await
    }

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> WidgetSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Returns a receiver notified on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<WidgetSnapshot> {
        self.snapshot_rx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WidgetConfig;
    use crate::loader::SdkLoader;
    use crate::provider::headless::{HeadlessFetcher, HeadlessSdk};
    use crate::state::WidgetMode;
    use schatzkarte_core::{ActionKind, MeetingAction, TimeWindowStatus};
    use std::sync::{Arc, Mutex};

    fn spawn(
        descriptor: MeetingDescriptor,
        fetcher: HeadlessFetcher,
    ) -> (
        WidgetHandle,
        tokio::task::JoinHandle<MeetingWidget>,
        Arc<Mutex<Vec<MeetingAction>>>,
    ) {
        let actions = Arc::new(Mutex::new(Vec::new()));
        let sink = actions.clone();
        let widget = MeetingWidget::new(
            descriptor,
            WidgetConfig::default(),
            Arc::new(SdkLoader::new(Arc::new(fetcher))),
            Arc::new(move |action| sink.lock().unwrap().push(action)),
        );
        let runtime = WidgetRuntime::new(widget);
        let handle = runtime.handle();
        (handle, tokio::spawn(runtime.run()), actions)
    }

    fn descriptor() -> MeetingDescriptor {
        MeetingDescriptor::new("lernraum-7", "m-1").with_display_name("Mia")
    }

    #[tokio::test(start_paused = true)]
    async fn join_and_leave_through_handle() {
        let sdk = HeadlessSdk::new();
        let (handle, task, actions) = spawn(descriptor(), HeadlessFetcher::new(sdk.clone()));
        let mut snapshots = handle.subscribe();

        handle.join().await.unwrap();
        snapshots
            .wait_for(|s| s.state.has_joined_conference)
            .await
            .unwrap();

        handle.toggle_size().await.unwrap();
        handle.minimize().await.unwrap();
        handle.restore().await.unwrap();
        handle.leave().await.unwrap();
        snapshots
            .wait_for(|s| s.state.mode == WidgetMode::JoinButton)
            .await
            .unwrap();

        handle.unmount().await.unwrap();
        let widget = task.await.unwrap();
        assert!(!widget.is_mounted());

        let stats = sdk.stats();
        assert_eq!(stats.connections_created, 1);
        assert_eq!(stats.connections_disposed, 1);
        let kinds: Vec<_> = actions.lock().unwrap().iter().map(|a| a.action).collect();
        assert_eq!(kinds, vec![ActionKind::Join, ActionKind::Leave]);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_every_minute() {
        let (handle, task, _) = spawn(
            descriptor().with_time_window(TimeWindowStatus::too_early(2)),
            HeadlessFetcher::default(),
        );
        let mut snapshots = handle.subscribe();
        let start = Instant::now();

        snapshots
            .wait_for(|s| s.state.minutes_remaining == 1)
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(60));

        snapshots
            .wait_for(|s| s.state.mode == WidgetMode::JoinButton)
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(120));
        assert!(matches!(handle.snapshot().view, WidgetView::JoinButton { .. }));

        handle.unmount().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_while_loading() {
        let sdk = HeadlessSdk::new();
        let fetcher = HeadlessFetcher::new(sdk.clone()).with_latency(Duration::from_secs(10));
        let (handle, task, actions) = spawn(descriptor(), fetcher);
        let mut snapshots = handle.subscribe();

        handle.join().await.unwrap();
        snapshots
            .wait_for(|s| s.state.connection_active)
            .await
            .unwrap();
        handle.unmount().await.unwrap();

        let widget = task.await.unwrap();
        assert_eq!(widget.view(), WidgetView::Nothing);
        assert_eq!(sdk.stats().connections_created, 0);
        assert!(actions.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn forced_join_from_host() {
        let sdk = HeadlessSdk::new();
        let (handle, task, _) = spawn(descriptor(), HeadlessFetcher::new(sdk.clone()));
        let mut snapshots = handle.subscribe();

        handle.force_join(true).await.unwrap();
        snapshots
            .wait_for(|s| s.state.connection_ready)
            .await
            .unwrap();
        assert_eq!(handle.snapshot().state.mode, WidgetMode::Small);

        handle.unmount().await.unwrap();
        task.await.unwrap();
        assert_eq!(sdk.stats().connections_disposed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_unmounts() {
        let sdk = HeadlessSdk::new();
        let (handle, task, actions) = spawn(descriptor(), HeadlessFetcher::new(sdk.clone()));
        let mut snapshots = handle.subscribe();

        handle.join().await.unwrap();
        snapshots
            .wait_for(|s| s.state.has_joined_conference)
            .await
            .unwrap();
        drop(handle);

        let widget = tokio::time::timeout(Duration::from_secs(3600), task)
            .await
            .expect("runtime stops once no handle is left")
            .unwrap();
        assert!(!widget.is_mounted());
        assert_eq!(sdk.stats().connections_disposed, 1);
        let kinds: Vec<_> = actions.lock().unwrap().iter().map(|a| a.action).collect();
        assert_eq!(kinds, vec![ActionKind::Join, ActionKind::Leave]);
    }

    #[tokio::test(start_paused = true)]
    async fn descriptor_refresh_restarts_the_minute() {
        let waiting = || descriptor().with_time_window(TimeWindowStatus::too_early(3));
        let (handle, task, _) = spawn(waiting(), HeadlessFetcher::default());

        tokio::time::sleep(Duration::from_secs(59)).await;
        handle.update_descriptor(waiting()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.snapshot().state.minutes_remaining, 3);

        let mut snapshots = handle.subscribe();
        let refreshed = Instant::now() - Duration::from_secs(2);
        snapshots
            .wait_for(|s| s.state.minutes_remaining == 2)
            .await
            .unwrap();
        assert!(refreshed.elapsed() >= Duration::from_secs(60));

        handle.unmount().await.unwrap();
        task.await.unwrap();
    }
}
