//! Join/leave reports sent back to the host.

use serde::{Deserialize, Serialize};

/// Island identifier the host uses to route widget reports.
pub const ISLAND_ID: &str = "jitsi_meeting";

/// The kind of report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "meeting_join")]
    Join,
    #[serde(rename = "meeting_leave")]
    Leave,
}

impl ActionKind {
    /// Returns the wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "meeting_join",
            Self::Leave => "meeting_leave",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured event passed to the host's `on_action` callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingAction {
    pub action: ActionKind,
    pub meeting_id: String,
    pub island_id: String,
}

impl MeetingAction {
    /// Report that the local participant joined.
    pub fn join(meeting_id: impl Into<String>) -> Self {
        Self::new(ActionKind::Join, meeting_id)
    }

    /// Report that the local participant left.
    pub fn leave(meeting_id: impl Into<String>) -> Self {
        Self::new(ActionKind::Leave, meeting_id)
    }

    fn new(action: ActionKind, meeting_id: impl Into<String>) -> Self {
        Self {
            action,
            meeting_id: meeting_id.into(),
            island_id: ISLAND_ID.to_string(),
        }
    }
}
