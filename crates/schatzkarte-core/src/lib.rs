//! Core types: meeting descriptor, time window, actions, geometry, tracing

pub mod action;
pub mod geometry;
pub mod meeting;
pub mod schedule;
pub mod tracing;

pub use action::{ActionKind, ISLAND_ID, MeetingAction};
pub use geometry::{Frame, Point, Size, Viewport};
pub use meeting::{
    DEFAULT_WAITING_THRESHOLD_MINUTES, MeetingDescriptor, ParticipantRole, Presence,
    TimeWindowStatus, WindowReason,
};
pub use schedule::MeetingSchedule;
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
