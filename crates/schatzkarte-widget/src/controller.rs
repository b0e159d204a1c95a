//! The floating meeting widget controller.
//!
//! [`MeetingWidget`] is the single owner of a widget's view state and of its
//! provider connection. Every input (user clicks, pointer moves, minute ticks,
//! provider events, SDK load completion) goes through a `&mut self` method, so
//! transitions are serialised the way a UI component's update function is.
//!
//! The connection is created once per join and survives every
//! `Small`/`Large`/`Minimized` change. It is torn down exactly once, by
//! [`MeetingWidget::dispose`] after an explicit leave or by
//! [`MeetingWidget::unmount`].

use std::fmt;
use std::sync::Arc;

use schatzkarte_core::{Frame, MeetingAction, MeetingDescriptor, Point, Presence, Viewport};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::WidgetConfig;
use crate::countdown::{Countdown, Tick};
use crate::error::LoadFailure;
use crate::frame::FrameController;
use crate::loader::{LoadOutcome, PendingLoad, SdkLoader};
use crate::provider::{
    ConferenceSdk, Connection, ConnectionOptions, ProviderCommand, ProviderEvent,
    ProviderEventSink, ProviderSignal,
};
use crate::state::{ViewTrigger, WidgetMode, WidgetViewState};

/// Host callback receiving join/leave reports.
pub type ActionCallback = Arc<dyn Fn(MeetingAction) + Send + Sync>;

enum ConnectionSlot {
    Absent,
    Loading,
    Failed(LoadFailure),
    Live {
        generation: u64,
        connection: Box<dyn Connection>,
    },
}

impl ConnectionSlot {
    fn label(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Loading => "loading",
            Self::Failed(_) => "failed",
            Self::Live { .. } => "live",
        }
    }
}

/// Layout of a video-bearing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoLayout {
    Small,
    Large,
    Minimized,
}

/// What the host should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WidgetView {
    /// Render nothing.
    Nothing,
    /// "Treffen in N Min".
    Countdown {
        minutes_remaining: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// The join affordance.
    JoinButton {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// The floating frame with the provider surface.
    Video {
        layout: VideoLayout,
        /// `None` when minimized: the surface stays mounted off-screen.
        frame: Option<Frame>,
        /// The surface is not mounted yet (or never will be, see `load_failed`).
        loading: bool,
        load_failed: bool,
        /// A drag/resize is active; cover the surface so it cannot eat pointer events.
        shield_surface: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

/// Controller for one floating meeting widget.
pub struct MeetingWidget {
    descriptor: MeetingDescriptor,
    config: WidgetConfig,
    loader: Arc<SdkLoader>,
    on_action: ActionCallback,
    state: WidgetViewState,
    frames: FrameController,
    countdown: Option<Countdown>,
    countdown_epoch: u64,
    slot: ConnectionSlot,
    generation: u64,
    pending_load: Option<PendingLoad>,
    signals_tx: mpsc::UnboundedSender<ProviderSignal>,
    signals_rx: Option<mpsc::UnboundedReceiver<ProviderSignal>>,
    force_join: bool,
    force_join_spent: bool,
    mounted: bool,
}

impl fmt::Debug for MeetingWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeetingWidget")
            .field("meeting_id", &self.descriptor.meeting_id)
            .field("state", &self.state)
            .field("connection", &self.slot.label())
            .field("load_failure", &self.load_failure().map(LoadFailure::message))
            .field("generation", &self.generation)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl MeetingWidget {
    /// Mounts a widget for `descriptor`.
    ///
    /// The initial mode comes from the descriptor's time window: `Waiting` inside
    /// the countdown threshold, `JoinButton` otherwise.
    pub fn new(
        descriptor: MeetingDescriptor,
        config: WidgetConfig,
        loader: Arc<SdkLoader>,
        on_action: ActionCallback,
    ) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let frames = FrameController::new(config.geometry.clone());
        let presence = descriptor.presence(config.countdown.waiting_threshold_minutes);

        let (mode, countdown) = match presence {
            Presence::Countdown { minutes } if minutes > 0 => {
                (WidgetMode::Waiting, Some(Countdown::start(minutes)))
            }
            _ => (WidgetMode::JoinButton, None),
        };
        let minutes = countdown.as_ref().map_or(0, Countdown::remaining);
        let mut state = WidgetViewState::new(mode, frames.small_frame(), minutes);
        state.countdown_elapsed = matches!(presence, Presence::Countdown { minutes: 0 });

        info!(
            meeting_id = %descriptor.meeting_id,
            ?presence,
            %mode,
            "Meeting widget mounted"
        );

        Self {
            descriptor,
            config,
            loader,
            on_action,
            state,
            frames,
            countdown,
            countdown_epoch: 0,
            slot: ConnectionSlot::Absent,
            generation: 0,
            pending_load: None,
            signals_tx,
            signals_rx: Some(signals_rx),
            force_join: false,
            force_join_spent: false,
            mounted: true,
        }
    }

    pub fn state(&self) -> &WidgetViewState {
        &self.state
    }

    pub fn mode(&self) -> WidgetMode {
        self.state.mode
    }

    pub fn descriptor(&self) -> &MeetingDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Generation of the most recently created connection (0 before the first).
    pub fn connection_generation(&self) -> u64 {
        self.generation
    }

    /// Returns true while a provider connection object exists.
    pub fn has_live_connection(&self) -> bool {
        matches!(self.slot, ConnectionSlot::Live { .. })
    }

    /// Why the last SDK load or connection attempt failed, if it did.
    pub fn load_failure(&self) -> Option<&LoadFailure> {
        match &self.slot {
            ConnectionSlot::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Presence derived from the current descriptor.
    pub fn presence(&self) -> Presence {
        self.descriptor
            .presence(self.config.countdown.waiting_threshold_minutes)
    }

    /// Returns true if a join click would be accepted right now.
    pub fn join_permitted(&self) -> bool {
        match self.presence() {
            Presence::Hidden => false,
            Presence::Joinable | Presence::Countdown { .. } => true,
            Presence::Dormant => self.state.countdown_elapsed,
        }
    }

    /// Returns true while the minute ticker should be running.
    pub fn countdown_active(&self) -> bool {
        self.mounted
            && self.state.mode == WidgetMode::Waiting
            && self.countdown.as_ref().is_some_and(Countdown::is_running)
    }

    /// Bumped every time the countdown restarts from a host value.
    ///
    /// A minute ticker must restart its period when this changes.
    pub fn countdown_epoch(&self) -> u64 {
        self.countdown_epoch
    }

    /// Computes the view to render.
    pub fn view(&self) -> WidgetView {
        if !self.mounted {
            return WidgetView::Nothing;
        }
        let title = self.descriptor.meeting_title.clone();
        let layout = match self.state.mode {
            WidgetMode::Waiting => {
                return WidgetView::Countdown {
                    minutes_remaining: self.state.minutes_remaining,
                    title,
                };
            }
            WidgetMode::JoinButton if self.join_permitted() => {
                return WidgetView::JoinButton { title };
            }
            WidgetMode::JoinButton => return WidgetView::Nothing,
            WidgetMode::Small => VideoLayout::Small,
            WidgetMode::Large => VideoLayout::Large,
            WidgetMode::Minimized => VideoLayout::Minimized,
        };
        WidgetView::Video {
            layout,
            frame: self.state.mode.has_frame().then(|| self.state.frame()),
            loading: !self.state.connection_ready,
            load_failed: self.state.load_failed,
            shield_surface: self.frames.is_active(),
            title,
        }
    }

    // ----------------------------------------------------------------------
    // View state machine
    // ----------------------------------------------------------------------

    fn enter_mode(&mut self, mode: WidgetMode) {
        if self.state.mode == WidgetMode::Waiting && mode != WidgetMode::Waiting {
            if let Some(ref mut countdown) = self.countdown {
                countdown.cancel();
            }
            self.countdown = None;
        }
        if self.state.mode != mode {
            self.frames.finish();
            debug!(
                meeting_id = %self.descriptor.meeting_id,
                from = %self.state.mode,
                to = %mode,
                "Widget mode changed"
            );
        }
        self.state.mode = mode;
    }

    /// Handles a click on the join affordance.
    ///
    /// Returns false (and changes nothing) if joining is not permitted.
    pub fn click_join(&mut self) -> bool {
        if !self.mounted {
            return false;
        }
        if !self.join_permitted() {
            debug!(
                meeting_id = %self.descriptor.meeting_id,
                presence = ?self.presence(),
                "Join rejected"
            );
            return false;
        }
        let Some(next) = self.state.mode.next(ViewTrigger::Join) else {
            return false;
        };
        self.enter_mode(next);
        self.state.set_frame(self.frames.small_frame());
        self.ensure_connection();
        true
    }

    /// Sets the host's force-join flag.
    ///
    /// A rising edge joins immediately if the widget shows a join button or
    /// countdown and the descriptor says joining is allowed now.
    pub fn set_force_join(&mut self, force: bool) {
        if !force {
            self.force_join_spent = false;
        }
        self.force_join = force;
        self.apply_force_join();
    }

    fn apply_force_join(&mut self) {
        if !self.force_join || self.force_join_spent || !self.descriptor.can_join_now {
            return;
        }
        if matches!(self.state.mode, WidgetMode::JoinButton | WidgetMode::Waiting) && self.click_join() {
            info!(meeting_id = %self.descriptor.meeting_id, "Join forced by host");
            self.force_join_spent = true;
        }
    }

    /// Replaces the descriptor with fresher host values.
    ///
    /// Video modes are left alone; only the pre-join modes follow the new time window.
    pub fn update_descriptor(&mut self, descriptor: MeetingDescriptor) {
        self.descriptor = descriptor;
        if !self.mounted {
            return;
        }
        if !self.state.mode.is_video() {
            match self.presence() {
                Presence::Countdown { minutes } if minutes > 0 => {
                    if self.state.mode == WidgetMode::Waiting || !self.state.countdown_elapsed {
                        self.countdown = Some(Countdown::start(minutes));
                        self.countdown_epoch += 1;
                        self.state.minutes_remaining = minutes;
                        self.enter_mode(WidgetMode::Waiting);
                    }
                }
                Presence::Countdown { .. } => {
                    self.state.countdown_elapsed = true;
                    self.state.minutes_remaining = 0;
                    self.enter_mode(WidgetMode::JoinButton);
                }
                Presence::Joinable | Presence::Dormant | Presence::Hidden => {
                    self.enter_mode(WidgetMode::JoinButton);
                }
            }
        }
        self.apply_force_join();
    }

    /// Switches between small and large.
    pub fn toggle_size(&mut self) -> bool {
        let Some(next) = self.state.mode.next(ViewTrigger::ToggleSize) else {
            return false;
        };
        let frame = if next == WidgetMode::Large {
            self.frames.large_frame()
        } else {
            self.frames.small_frame()
        };
        self.enter_mode(next);
        self.state.set_frame(frame);
        true
    }

    /// Hides the frame; the connection surface stays mounted.
    pub fn minimize(&mut self) -> bool {
        let Some(next) = self.state.mode.next(ViewTrigger::Minimize) else {
            return false;
        };
        if self.state.mode == WidgetMode::Small {
            self.frames.remember_small(self.state.frame());
        }
        self.enter_mode(next);
        true
    }

    /// Brings a minimized widget back as a small frame.
    pub fn restore(&mut self) -> bool {
        let Some(next) = self.state.mode.next(ViewTrigger::Restore) else {
            return false;
        };
        let frame = self.frames.restored_frame();
        self.enter_mode(next);
        self.state.set_frame(frame);
        true
    }

    /// Advances the waiting countdown by one minute.
    ///
    /// Inert outside `Waiting` or after the countdown stopped.
    pub fn countdown_tick(&mut self) -> bool {
        if self.state.mode != WidgetMode::Waiting {
            return false;
        }
        let Some(ref mut countdown) = self.countdown else {
            return false;
        };
        match countdown.tick() {
            Tick::Remaining(minutes) => {
                self.state.minutes_remaining = minutes;
                debug!(meeting_id = %self.descriptor.meeting_id, minutes, "Countdown tick");
                true
            }
            Tick::Elapsed => {
                self.state.minutes_remaining = 0;
                self.state.countdown_elapsed = true;
                if let Some(next) = self.state.mode.next(ViewTrigger::CountdownElapsed) {
                    self.enter_mode(next);
                }
                info!(meeting_id = %self.descriptor.meeting_id, "Countdown elapsed, meeting can be joined");
                true
            }
            Tick::Stopped => false,
        }
    }

    // ----------------------------------------------------------------------
    // Drag & resize
    // ----------------------------------------------------------------------

    /// Pointer pressed on the title bar. `over_control` is true for its buttons.
    pub fn pointer_down_title(&mut self, pointer: Point, over_control: bool) -> bool {
        if !self.state.mode.has_frame() {
            return false;
        }
        self.frames.begin_drag(pointer, self.state.frame(), over_control)
    }

    /// Pointer pressed on the resize handle.
    pub fn pointer_down_resize(&mut self, pointer: Point) -> bool {
        if !self.state.mode.has_frame() {
            return false;
        }
        self.frames.begin_resize(pointer, self.state.frame())
    }

    /// Pointer moved. Returns true if the frame changed.
    pub fn pointer_move(&mut self, pointer: Point) -> bool {
        match self.frames.track(pointer, self.state.frame()) {
            Some(frame) if frame != self.state.frame() => {
                self.state.set_frame(frame);
                true
            }
            _ => false,
        }
    }

    /// Pointer released or touch ended.
    pub fn pointer_up(&mut self) -> bool {
        self.frames.finish()
    }

    /// The browser viewport changed size.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let frame = self.frames.set_viewport(viewport, self.state.frame());
        match self.state.mode {
            WidgetMode::Large => self.state.set_frame(self.frames.large_frame()),
            WidgetMode::Small => self.state.set_frame(frame),
            _ => {}
        }
    }

    // ----------------------------------------------------------------------
    // Connection lifecycle
    // ----------------------------------------------------------------------

    /// Makes sure a connection exists or is on its way.
    ///
    /// Only acts in a video mode. Idempotent: the slot is checked and flipped to `Loading` before any
    /// asynchronous work is handed out, so a second call while the first load is
    /// in flight is a no-op. Returns true if a new load was started.
    pub fn ensure_connection(&mut self) -> bool {
        if !matches!(self.slot, ConnectionSlot::Absent) || !self.mounted || !self.state.mode.is_video() {
            return false;
        }
        if self.descriptor.connectable_room().is_none() {
            warn!(meeting_id = %self.descriptor.meeting_id, "No connectable room, not connecting");
            return false;
        }

        self.state.connection_active = true;
        let app_id = self.descriptor.provider_app_id.as_deref();
        match self.config.provider.script_url(app_id) {
            Ok(url) => {
                debug!(meeting_id = %self.descriptor.meeting_id, %url, "Requesting conferencing SDK");
                self.slot = ConnectionSlot::Loading;
                self.pending_load = Some(self.loader.begin(url));
                true
            }
            Err(e) => {
                error!(meeting_id = %self.descriptor.meeting_id, error = %e, "Cannot build SDK url");
                self.state.load_failed = true;
                self.slot = ConnectionSlot::Failed(LoadFailure::from(e));
                false
            }
        }
    }

    /// Hands out the load started by [`ensure_connection`](Self::ensure_connection).
    ///
    /// The caller awaits it and passes the outcome to [`complete_load`](Self::complete_load).
    pub fn take_pending_load(&mut self) -> Option<PendingLoad> {
        self.pending_load.take()
    }

    /// Receives the SDK load outcome and creates the connection.
    ///
    /// Ignored if the widget unmounted, the user left meanwhile, or the slot is
    /// no longer waiting for a load.
    pub fn complete_load(&mut self, outcome: LoadOutcome) {
        if !self.mounted {
            debug!(meeting_id = %self.descriptor.meeting_id, "Widget unmounted before SDK load finished");
            return;
        }
        if !matches!(self.slot, ConnectionSlot::Loading) || !self.state.mode.is_video() {
            debug!(
                meeting_id = %self.descriptor.meeting_id,
                slot = self.slot.label(),
                "Stale SDK load result ignored"
            );
            return;
        }
        match outcome {
            Ok(sdk) => self.create_connection(&*sdk),
            Err(failure) => {
                warn!(
                    meeting_id = %self.descriptor.meeting_id,
                    error = %failure,
                    "Conferencing SDK unavailable, widget stays in loading state"
                );
                self.state.load_failed = true;
                self.slot = ConnectionSlot::Failed(failure);
            }
        }
    }

    fn connection_options(&self) -> Option<ConnectionOptions> {
        let room = self.descriptor.connectable_room()?;
        let app_id = self.descriptor.provider_app_id.as_deref();
        Some(ConnectionOptions {
            room_name: self.config.provider.room_name(room, app_id),
            jwt: self.descriptor.auth_token.clone(),
            display_name: self.descriptor.display_name.clone(),
            parent_node_id: self.config.provider.parent_node_id.clone(),
            config_overwrite: self.descriptor.connection_options.clone(),
            interface_config_overwrite: self.descriptor.ui_options.clone(),
        })
    }

    fn create_connection(&mut self, sdk: &dyn ConferenceSdk) {
        let Some(options) = self.connection_options() else {
            warn!(meeting_id = %self.descriptor.meeting_id, "Room disappeared before connection creation");
            self.slot = ConnectionSlot::Absent;
            self.state.connection_active = false;
            return;
        };
        let generation = self.generation + 1;
        let sink = ProviderEventSink::new(generation, self.signals_tx.clone());
        match sdk.create_connection(options, sink) {
            Ok(connection) => {
                self.generation = generation;
                info!(
                    meeting_id = %self.descriptor.meeting_id,
                    provider = sdk.name(),
                    generation,
                    "Connection created"
                );
                self.slot = ConnectionSlot::Live {
                    generation,
                    connection,
                };
            }
            Err(e) => {
                error!(meeting_id = %self.descriptor.meeting_id, error = %e, "Connection creation failed");
                self.state.load_failed = true;
                self.slot = ConnectionSlot::Failed(LoadFailure::from(e));
            }
        }
    }

    /// Applies one provider event.
    pub fn handle_provider_signal(&mut self, signal: ProviderSignal) {
        let current = match self.slot {
            ConnectionSlot::Live { generation, .. } => generation,
            _ => {
                debug!(event = ?signal.event, "Provider event without live connection ignored");
                return;
            }
        };
        if signal.generation != current {
            debug!(
                event = ?signal.event,
                generation = signal.generation,
                current,
                "Provider event from a disposed connection ignored"
            );
            return;
        }

        match signal.event {
            ProviderEvent::SurfaceMounted => {
                self.state.connection_ready = true;
            }
            ProviderEvent::Joined => {
                let first_join = !self.state.has_joined_conference;
                self.state.has_joined_conference = true;
                if let ConnectionSlot::Live { ref mut connection, .. } = self.slot {
                    connection.apply_surface_style(&self.config.surface);
                }
                if first_join {
                    info!(meeting_id = %self.descriptor.meeting_id, "Joined conference");
                    self.report(MeetingAction::join(self.descriptor.meeting_id.clone()));
                }
            }
            ProviderEvent::Left | ProviderEvent::ReadyToClose => {
                if self.state.departure_confirmed() {
                    self.dispose();
                } else {
                    debug!(
                        event = ?signal.event,
                        joined = self.state.has_joined_conference,
                        explicit = self.state.is_explicit_leave,
                        "Ignoring provider departure the user did not ask for"
                    );
                }
            }
        }
    }

    /// Applies every provider event queued so far. Returns how many were handled.
    ///
    /// Does nothing once the receiver was taken by [`take_provider_signals`](Self::take_provider_signals).
    pub fn pump_provider_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let signal = match self.signals_rx.as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            let Some(signal) = signal else {
                break;
            };
            self.handle_provider_signal(signal);
            handled += 1;
        }
        handled
    }

    /// Takes the provider event receiver, for hosts that multiplex it themselves.
    pub fn take_provider_signals(&mut self) -> Option<mpsc::UnboundedReceiver<ProviderSignal>> {
        self.signals_rx.take()
    }

    /// Runs pending loads and queued provider events until nothing is left.
    pub async fn settle(&mut self) {
        loop {
            if let Some(load) = self.pending_load.take() {
                let outcome = load.await;
                self.complete_load(outcome);
                continue;
            }
            if self.pump_provider_events() == 0 {
                break;
            }
        }
    }

    /// Leave clicked.
    ///
    /// Asks the provider to hang up and waits for its confirmation. Without a
    /// joined conference, or if the hangup fails, disposes right away.
    pub fn request_leave(&mut self) -> bool {
        if !self.state.mode.is_video() {
            return false;
        }
        self.state.is_explicit_leave = true;

        let hangup = match self.slot {
            ConnectionSlot::Live {
                ref mut connection, ..
            } if self.state.has_joined_conference => Some(connection.execute(ProviderCommand::Hangup)),
            _ => None,
        };

        match hangup {
            Some(Ok(())) => {
                debug!(meeting_id = %self.descriptor.meeting_id, "Hangup sent, waiting for provider");
            }
            Some(Err(e)) => {
                warn!(meeting_id = %self.descriptor.meeting_id, error = %e, "Hangup failed, disposing locally");
                self.dispose();
            }
            None => {
                debug!(meeting_id = %self.descriptor.meeting_id, "Nothing to hang up, disposing locally");
                self.dispose();
            }
        }
        true
    }

    /// Tears the connection down and returns to the join button.
    ///
    /// Idempotent: returns false and reports nothing if there is nothing to dispose.
    pub fn dispose(&mut self) -> bool {
        if matches!(self.slot, ConnectionSlot::Absent) && !self.state.connection_active {
            return false;
        }

        self.pending_load = None;
        if let ConnectionSlot::Live {
            generation,
            mut connection,
        } = std::mem::replace(&mut self.slot, ConnectionSlot::Absent)
        {
            connection.dispose();
            info!(meeting_id = %self.descriptor.meeting_id, generation, "Connection disposed");
        }

        self.state.reset_connection();
        let next = self
            .state
            .mode
            .next(ViewTrigger::Leave)
            .unwrap_or(WidgetMode::JoinButton);
        self.enter_mode(next);
        self.state.set_frame(self.frames.small_frame());
        self.report(MeetingAction::leave(self.descriptor.meeting_id.clone()));
        true
    }

    /// Tears everything down when the host removes the widget.
    ///
    /// A joined conference is reported as left. Later calls are no-ops.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.countdown = None;
        self.pending_load = None;
        self.frames.finish();

        if let ConnectionSlot::Live {
            generation,
            mut connection,
        } = std::mem::replace(&mut self.slot, ConnectionSlot::Absent)
        {
            connection.dispose();
            debug!(meeting_id = %self.descriptor.meeting_id, generation, "Connection disposed on unmount");
        }
        self.slot = ConnectionSlot::Absent;

        let was_joined = self.state.has_joined_conference;
        self.state.reset_connection();
        if was_joined {
            self.report(MeetingAction::leave(self.descriptor.meeting_id.clone()));
        }
        info!(meeting_id = %self.descriptor.meeting_id, "Meeting widget unmounted");
    }

    fn report(&self, action: MeetingAction) {
        debug!(action = %action.action, meeting_id = %action.meeting_id, "Reporting to host");
        (self.on_action)(action);
    }
}

impl Drop for MeetingWidget {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::headless::{HeadlessBehavior, HeadlessFetcher, HeadlessSdk};
    use schatzkarte_core::{ActionKind, Size, TimeWindowStatus};
    use std::sync::Mutex;

    struct Harness {
        widget: MeetingWidget,
        sdk: HeadlessSdk,
        actions: Arc<Mutex<Vec<MeetingAction>>>,
    }

    impl Harness {
        fn actions(&self) -> Vec<ActionKind> {
            self.actions.lock().unwrap().iter().map(|a| a.action).collect()
        }
    }

    fn descriptor() -> MeetingDescriptor {
        MeetingDescriptor::new("lernraum-7", "m-1")
            .with_display_name("Mia")
            .with_title("Mathe")
    }

    fn harness_with(descriptor: MeetingDescriptor, sdk: HeadlessSdk, fetcher: HeadlessFetcher) -> Harness {
        let actions = Arc::new(Mutex::new(Vec::new()));
        let sink = actions.clone();
        let widget = MeetingWidget::new(
            descriptor,
            WidgetConfig::default(),
            Arc::new(SdkLoader::new(Arc::new(fetcher))),
            Arc::new(move |action| sink.lock().unwrap().push(action)),
        );
        Harness {
            widget,
            sdk,
            actions,
        }
    }

    fn harness(descriptor: MeetingDescriptor) -> Harness {
        let sdk = HeadlessSdk::new();
        let fetcher = HeadlessFetcher::new(sdk.clone());
        harness_with(descriptor, sdk, fetcher)
    }

    async fn joined() -> Harness {
        let mut h = harness(descriptor());
        assert!(h.widget.click_join());
        h.widget.settle().await;
        assert!(h.widget.state().has_joined_conference);
        h
    }

    #[tokio::test]
    async fn layout_changes_keep_one_connection() {
        let mut h = joined().await;

        for _ in 0..3 {
            assert!(h.widget.toggle_size());
            assert!(h.widget.minimize());
            assert!(h.widget.restore());
            assert!(h.widget.toggle_size());
            assert!(h.widget.toggle_size());
            h.widget.ensure_connection();
            h.widget.settle().await;
        }

        let stats = h.sdk.stats();
        assert_eq!(stats.connections_created, 1);
        assert_eq!(stats.connections_disposed, 0);
        assert_eq!(stats.fetches, 1);
        assert_eq!(h.widget.connection_generation(), 1);
        assert!(h.widget.state().connection_active);
    }

    #[tokio::test]
    async fn dispose_is_idempotent() {
        let mut h = joined().await;

        assert!(h.widget.dispose());
        let after_first = h.widget.state().clone();
        assert!(!h.widget.dispose());

        assert_eq!(h.widget.state(), &after_first);
        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
        assert_eq!(h.actions(), vec![ActionKind::Join, ActionKind::Leave]);
        assert_eq!(h.sdk.stats().connections_disposed, 1);
    }

    #[tokio::test]
    async fn spurious_departures_are_ignored() {
        let mut h = joined().await;
        h.widget.toggle_size();

        assert!(h.sdk.emit(ProviderEvent::Left));
        assert!(h.sdk.emit(ProviderEvent::ReadyToClose));
        assert_eq!(h.widget.pump_provider_events(), 2);

        assert_eq!(h.widget.mode(), WidgetMode::Large);
        assert!(h.widget.state().connection_active);
        assert!(h.widget.has_live_connection());
        assert_eq!(h.actions(), vec![ActionKind::Join]);
    }

    #[tokio::test]
    async fn explicit_leave_waits_for_provider() {
        let mut h = joined().await;

        assert!(h.widget.request_leave());
        assert!(h.widget.state().is_explicit_leave);
        assert_eq!(h.widget.mode(), WidgetMode::Small);

        h.widget.settle().await;
        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
        assert!(!h.widget.state().connection_active);
        assert!(!h.widget.state().is_explicit_leave);
        assert_eq!(h.sdk.stats().hangups, 1);
        assert_eq!(h.sdk.stats().connections_disposed, 1);
        assert_eq!(h.actions(), vec![ActionKind::Join, ActionKind::Leave]);
    }

    #[tokio::test]
    async fn failed_hangup_still_leaves() {
        let mut h = joined().await;
        h.sdk.set_fail_hangup(true);
        h.widget.minimize();

        assert!(h.widget.request_leave());

        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
        assert!(!h.widget.state().connection_active);
        assert_eq!(h.sdk.stats().connections_disposed, 1);
        assert_eq!(h.actions(), vec![ActionKind::Join, ActionKind::Leave]);
    }

    #[tokio::test]
    async fn leave_before_join_confirmation_disposes_directly() {
        let sdk = HeadlessSdk::with_behavior(HeadlessBehavior {
            auto_join: false,
            ..Default::default()
        });
        let mut h = harness_with(descriptor(), sdk.clone(), HeadlessFetcher::new(sdk));
        h.widget.click_join();
        h.widget.settle().await;
        assert!(h.widget.state().connection_ready);
        assert!(!h.widget.state().has_joined_conference);

        h.widget.request_leave();
        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
        assert_eq!(h.sdk.stats().hangups, 0);
        assert_eq!(h.actions(), vec![ActionKind::Leave]);
    }

    #[test]
    fn countdown_runs_out() {
        let mut h = harness(descriptor().with_time_window(TimeWindowStatus::too_early(3)));
        assert_eq!(h.widget.mode(), WidgetMode::Waiting);
        assert!(h.widget.countdown_active());

        assert!(h.widget.countdown_tick());
        assert_eq!(h.widget.state().minutes_remaining, 2);
        assert!(h.widget.countdown_tick());
        assert!(h.widget.countdown_tick());

        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
        assert!(!h.widget.countdown_active());
        let before = h.widget.state().clone();
        assert!(!h.widget.countdown_tick());
        assert_eq!(h.widget.state(), &before);
        assert_eq!(h.widget.view(), WidgetView::JoinButton { title: Some("Mathe".into()) });
    }

    #[test]
    fn refreshed_descriptor_then_forced_join() {
        let mut h = harness(descriptor().with_time_window(TimeWindowStatus::too_early(3)));
        let mut fresh = descriptor();
        fresh.time_window = TimeWindowStatus::open(60);
        h.widget.update_descriptor(fresh);
        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);

        h.widget.set_force_join(true);
        assert_eq!(h.widget.mode(), WidgetMode::Small);
        assert!(!h.widget.countdown_active());
        assert!(!h.widget.countdown_tick());
        assert_eq!(h.widget.mode(), WidgetMode::Small);
    }

    #[test]
    fn waiting_widget_force_join_when_joinable() {
        let mut h = harness(descriptor().with_time_window(TimeWindowStatus::too_early(2)));
        h.widget.descriptor.can_join_now = true;
        h.widget.set_force_join(true);
        assert_eq!(h.widget.mode(), WidgetMode::Small);
        assert!(h.widget.take_pending_load().is_some());
    }

    #[test]
    fn rendering_policy() {
        let mut no_room = descriptor();
        no_room.room_identifier = None;
        let mut h = harness(no_room);
        assert_eq!(h.widget.view(), WidgetView::Nothing);
        assert!(!h.widget.click_join());
        assert!(h.widget.take_pending_load().is_none());

        let mut h = harness(descriptor().with_time_window(TimeWindowStatus::too_early(45)));
        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
        assert_eq!(h.widget.view(), WidgetView::Nothing);
        assert!(!h.widget.click_join());

        let h = harness(descriptor().with_time_window(TimeWindowStatus::too_early(10)));
        assert_eq!(h.widget.mode(), WidgetMode::Waiting);
        let json = serde_json::to_string(&h.widget.view()).unwrap();
        insta::assert_snapshot!(json, @r#"{"view":"countdown","minutesRemaining":10,"title":"Mathe"}"#);

        let mut h = harness(descriptor());
        assert_eq!(h.widget.view(), WidgetView::JoinButton { title: Some("Mathe".into()) });
        assert!(h.widget.click_join());
        assert_eq!(h.widget.mode(), WidgetMode::Small);
        assert!(h.widget.state().connection_active);
        assert!(h.widget.take_pending_load().is_some());
    }

    #[test]
    fn ended_meeting_never_connects() {
        let mut h = harness(descriptor().with_time_window(TimeWindowStatus::ended()));
        h.widget.descriptor.can_join_now = true;
        assert_eq!(h.widget.view(), WidgetView::Nothing);
        assert!(!h.widget.click_join());
        assert!(!h.widget.ensure_connection());
        h.widget.set_force_join(true);
        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
    }

    #[test]
    fn ensure_connection_is_synchronously_guarded() {
        let mut h = harness(descriptor());
        h.widget.click_join();
        assert!(!h.widget.ensure_connection());
        assert!(!h.widget.ensure_connection());
        assert!(h.widget.take_pending_load().is_some());
        assert!(h.widget.take_pending_load().is_none());
    }

    #[tokio::test]
    async fn video_view_while_loading_and_after_join() {
        let mut h = harness(descriptor());
        h.widget.click_join();
        let WidgetView::Video { loading, frame, .. } = h.widget.view() else {
            panic!("expected video view");
        };
        assert!(loading);
        assert_eq!(frame, Some(Frame::new(Point::new(900.0, 510.0), Size::new(360.0, 270.0))));

        h.widget.settle().await;
        let WidgetView::Video { loading, layout, .. } = h.widget.view() else {
            panic!("expected video view");
        };
        assert!(!loading);
        assert_eq!(layout, VideoLayout::Small);

        h.widget.minimize();
        let WidgetView::Video { frame, layout, .. } = h.widget.view() else {
            panic!("expected video view");
        };
        assert_eq!(layout, VideoLayout::Minimized);
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn load_failure_keeps_spinner_and_leave_still_works() {
        let sdk = HeadlessSdk::new();
        let fetcher = HeadlessFetcher::new(sdk.clone()).with_failure("blocked");
        let mut h = harness_with(descriptor(), sdk, fetcher);

        h.widget.click_join();
        h.widget.settle().await;
        assert_eq!(
            h.widget.view(),
            WidgetView::Video {
                layout: VideoLayout::Small,
                frame: Some(Frame::new(Point::new(900.0, 510.0), Size::new(360.0, 270.0))),
                loading: true,
                load_failed: true,
                shield_surface: false,
                title: Some("Mathe".into()),
            }
        );
        assert_eq!(h.sdk.stats().connections_created, 0);
        let message = h.widget.load_failure().map(LoadFailure::message).unwrap();
        assert!(message.ends_with(": blocked"), "{message}");

        assert!(h.widget.request_leave());
        assert!(h.widget.load_failure().is_none());
        assert_eq!(h.widget.mode(), WidgetMode::JoinButton);
        assert!(!h.widget.state().load_failed);
        assert_eq!(h.actions(), vec![ActionKind::Leave]);
    }

    #[tokio::test]
    async fn unmount_during_load_creates_nothing() {
        let mut h = harness(descriptor());
        h.widget.click_join();
        let load = h.widget.take_pending_load().unwrap();

        h.widget.unmount();
        let outcome = load.await;
        h.widget.complete_load(outcome);

        assert_eq!(h.sdk.stats().connections_created, 0);
        assert_eq!(h.widget.view(), WidgetView::Nothing);
        assert!(h.actions().is_empty());
    }

    #[tokio::test]
    async fn unmount_disposes_and_reports_once() {
        let mut h = joined().await;
        h.widget.unmount();
        h.widget.unmount();
        drop(h.widget);

        assert_eq!(h.sdk.stats().connections_disposed, 1);
        let actions = h.actions.lock().unwrap().clone();
        assert_eq!(actions, vec![MeetingAction::join("m-1"), MeetingAction::leave("m-1")]);
    }

    #[tokio::test]
    async fn events_from_old_connection_are_dropped() {
        let mut h = joined().await;
        h.widget.request_leave();
        h.widget.settle().await;

        assert!(h.widget.click_join());
        h.widget.settle().await;
        assert_eq!(h.widget.connection_generation(), 2);

        h.widget.request_leave();
        h.widget.handle_provider_signal(ProviderSignal {
            generation: 1,
            event: ProviderEvent::ReadyToClose,
        });
        assert!(h.widget.has_live_connection());

        h.widget.settle().await;
        assert!(!h.widget.has_live_connection());
        assert_eq!(h.sdk.stats().connections_created, 2);
        assert_eq!(h.sdk.stats().connections_disposed, 2);
    }

    #[tokio::test]
    async fn rejoin_restyles_but_reports_once() {
        let mut h = joined().await;
        h.sdk.emit(ProviderEvent::Joined);
        h.widget.pump_provider_events();

        let stats = h.sdk.stats();
        assert_eq!(stats.styles_applied, 2);
        assert_eq!(stats.last_style, Some(WidgetConfig::default().surface));
        assert_eq!(h.actions(), vec![ActionKind::Join]);
    }

    #[tokio::test]
    async fn connection_options_come_from_descriptor() {
        let mut descriptor = descriptor()
            .with_provider_app_id("vpaas-magic-cookie-1")
            .with_auth_token("jwt-token");
        descriptor
            .connection_options
            .insert("startWithVideoMuted".into(), serde_json::Value::Bool(true));
        let mut h = harness(descriptor);
        h.widget.click_join();
        h.widget.settle().await;

        let options = h.sdk.stats().last_options.unwrap();
        assert_eq!(options.room_name, "vpaas-magic-cookie-1/lernraum-7");
        assert_eq!(options.jwt.as_deref(), Some("jwt-token"));
        assert_eq!(options.display_name, "Mia");
        assert!(options.config_overwrite.contains_key("startWithVideoMuted"));
    }

    #[tokio::test]
    async fn dragging_is_clamped_and_shields_the_surface() {
        let mut h = joined().await;
        let start = h.widget.state().frame();

        assert!(h.widget.pointer_down_title(Point::new(1000.0, 520.0), false));
        assert!(matches!(h.widget.view(), WidgetView::Video { shield_surface: true, .. }));

        assert!(h.widget.pointer_move(Point::new(9000.0, 9000.0)));
        assert_eq!(h.widget.state().frame_position, Point::new(1220.0, 740.0));
        assert_eq!(h.widget.state().frame_size, start.size);

        assert!(h.widget.pointer_up());
        assert!(matches!(h.widget.view(), WidgetView::Video { shield_surface: false, .. }));
        assert!(!h.widget.pointer_move(Point::new(0.0, 0.0)));
        assert_eq!(h.sdk.stats().connections_created, 1);
    }

    #[tokio::test]
    async fn resize_and_mode_change_cancels_gesture() {
        let mut h = joined().await;

        assert!(h.widget.pointer_down_resize(Point::new(1260.0, 780.0)));
        h.widget.pointer_move(Point::new(1000.0, 600.0));
        assert_eq!(h.widget.state().frame_size, Size::new(240.0, 180.0));

        h.widget.minimize();
        assert!(!h.widget.pointer_up());
        assert!(!h.widget.pointer_down_title(Point::new(0.0, 0.0), false));

        h.widget.restore();
        assert_eq!(h.widget.state().frame_size, Size::new(240.0, 180.0));
    }

    #[tokio::test]
    async fn large_mode_geometry_follows_viewport() {
        let mut h = joined().await;
        h.widget.toggle_size();
        assert_eq!(h.widget.state().frame_size, Size::new(1024.0, 640.0));
        assert_eq!(h.widget.state().frame_position, Point::new(128.0, 80.0));

        h.widget.set_viewport(Size::new(1000.0, 500.0));
        assert_eq!(h.widget.state().frame_size, Size::new(800.0, 400.0));
        assert_eq!(h.widget.state().frame_position, Point::new(100.0, 50.0));

        h.widget.toggle_size();
        assert_eq!(h.widget.state().frame_position, Point::new(620.0, 210.0));
    }

    #[test]
    fn descriptor_refresh_enters_countdown() {
        let mut h = harness(descriptor().with_time_window(TimeWindowStatus::too_early(45)));
        assert_eq!(h.widget.view(), WidgetView::Nothing);

        h.widget
            .update_descriptor(descriptor().with_time_window(TimeWindowStatus::too_early(30)));
        assert_eq!(h.widget.mode(), WidgetMode::Waiting);
        assert_eq!(h.widget.state().minutes_remaining, 30);
        assert!(h.widget.countdown_active());
    }

    #[test]
    fn countdown_restart_bumps_epoch() {
        let mut h = harness(descriptor().with_time_window(TimeWindowStatus::too_early(3)));
        let first = h.widget.countdown_epoch();
        h.widget.countdown_tick();
        assert_eq!(h.widget.countdown_epoch(), first);

        h.widget
            .update_descriptor(descriptor().with_time_window(TimeWindowStatus::too_early(3)));
        assert_eq!(h.widget.state().minutes_remaining, 3);
        assert_eq!(h.widget.countdown_epoch(), first + 1);

        h.widget.update_descriptor(descriptor().with_time_window(TimeWindowStatus::open(50)));
        assert_eq!(h.widget.countdown_epoch(), first + 1);
    }
}
