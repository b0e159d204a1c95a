//! View state of one widget instance.

use schatzkarte_core::{Frame, Point, Size};
use serde::Serialize;

/// Visual mode of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetMode {
    JoinButton,
    Waiting,
    Minimized,
    Small,
    Large,
}

/// User or timer input that may move the widget between modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewTrigger {
    /// Join clicked, or the host forced a join.
    Join,
    /// The waiting countdown reached zero.
    CountdownElapsed,
    ToggleSize,
    Minimize,
    Restore,
    /// The connection was disposed after an explicit leave.
    Leave,
}

impl WidgetMode {
    /// Returns the mode `trigger` leads to, or `None` if it is not legal here.
    pub fn next(self, trigger: ViewTrigger) -> Option<WidgetMode> {
        use ViewTrigger as T;
        use WidgetMode as M;

        match (self, trigger) {
            (M::JoinButton | M::Waiting, T::Join) => Some(M::Small),
            (M::Waiting, T::CountdownElapsed) => Some(M::JoinButton),
            (M::Small, T::ToggleSize) => Some(M::Large),
            (M::Large, T::ToggleSize) => Some(M::Small),
            (M::Small | M::Large, T::Minimize) => Some(M::Minimized),
            (M::Minimized, T::Restore) => Some(M::Small),
            (M::Small | M::Large | M::Minimized, T::Leave) => Some(M::JoinButton),
            _ => None,
        }
    }

    /// Returns true for modes that carry a connection surface.
    pub fn is_video(&self) -> bool {
        matches!(self, Self::Small | Self::Large | Self::Minimized)
    }

    /// Returns true for modes that show a movable frame.
    pub fn has_frame(&self) -> bool {
        matches!(self, Self::Small | Self::Large)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JoinButton => "join-button",
            Self::Waiting => "waiting",
            Self::Minimized => "minimized",
            Self::Small => "small",
            Self::Large => "large",
        }
    }
}

impl std::fmt::Display for WidgetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state owned by the controller.
///
/// The four connection flags are the guards for provider events:
/// `Left`/`ReadyToClose` only count when both `has_joined_conference` and
/// `is_explicit_leave` are set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetViewState {
    pub mode: WidgetMode,
    /// A connection exists (or is being created) and is not disposed.
    pub connection_active: bool,
    /// The provider surface is mounted.
    pub connection_ready: bool,
    /// The provider reported that we joined.
    pub has_joined_conference: bool,
    /// The user clicked leave.
    pub is_explicit_leave: bool,
    /// The SDK failed to load; the surface keeps showing a spinner.
    pub load_failed: bool,
    /// The waiting countdown ran out during this mount.
    pub countdown_elapsed: bool,
    pub frame_position: Point,
    pub frame_size: Size,
    pub minutes_remaining: u32,
}

impl WidgetViewState {
    pub fn new(mode: WidgetMode, frame: Frame, minutes_remaining: u32) -> Self {
        Self {
            mode,
            connection_active: false,
            connection_ready: false,
            has_joined_conference: false,
            is_explicit_leave: false,
            load_failed: false,
            countdown_elapsed: false,
            frame_position: frame.position,
            frame_size: frame.size,
            minutes_remaining,
        }
    }

    pub fn frame(&self) -> Frame {
        Frame::new(self.frame_position, self.frame_size)
    }

    pub fn set_frame(&mut self, frame: Frame) {
        self.frame_position = frame.position;
        self.frame_size = frame.size;
    }

    /// Clears every connection flag.
    pub fn reset_connection(&mut self) {
        self.connection_active = false;
        self.connection_ready = false;
        self.has_joined_conference = false;
        self.is_explicit_leave = false;
        self.load_failed = false;
    }

    /// Returns true if a `Left`/`ReadyToClose` event is a real departure.
    pub fn departure_confirmed(&self) -> bool {
        self.has_joined_conference && self.is_explicit_leave
    }
}
