//! Meeting metadata supplied by the host page.
//!
//! The host owns scheduling and credentials; the widget only reads a
//! [`MeetingDescriptor`] and derives a [`Presence`] from it, which decides
//! whether anything is rendered at all and which mode the widget mounts in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Minutes before start at which the waiting countdown becomes visible.
pub const DEFAULT_WAITING_THRESHOLD_MINUTES: u32 = 30;

/// Why joining is not possible right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowReason {
    /// The meeting has not started yet.
    TooEarly,
    /// The meeting is over.
    Ended,
    /// There is no meeting scheduled.
    NoMeeting,
}

/// Time-window status as computed by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<WindowReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_until_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_remaining: Option<i64>,
}

impl TimeWindowStatus {
    /// Status for a meeting that starts in `minutes`.
    pub fn too_early(minutes: i64) -> Self {
        Self {
            reason: Some(WindowReason::TooEarly),
            minutes_until_start: Some(minutes),
            minutes_remaining: None,
        }
    }

    /// Status for a meeting that is over.
    pub fn ended() -> Self {
        Self {
            reason: Some(WindowReason::Ended),
            ..Default::default()
        }
    }

    /// Status for a running meeting with `minutes` left.
    pub fn open(minutes: i64) -> Self {
        Self {
            reason: None,
            minutes_until_start: None,
            minutes_remaining: Some(minutes),
        }
    }

    /// Returns true if the window is terminal (ended or no meeting).
    pub fn is_closed(&self) -> bool {
        matches!(
            self.reason,
            Some(WindowReason::Ended) | Some(WindowReason::NoMeeting)
        )
    }
}

/// Role of the local participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Coach,
    #[default]
    Attendee,
}

/// Everything the host tells the widget about one meeting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDescriptor {
    /// Whether the time window currently permits joining.
    #[serde(default)]
    pub can_join_now: bool,
    /// Opaque conference room name; `None` means no meeting exists.
    #[serde(default)]
    pub room_identifier: Option<String>,
    /// Provider configuration overrides.
    #[serde(default)]
    pub connection_options: Map<String, Value>,
    /// Provider interface customisation.
    #[serde(default)]
    pub ui_options: Map<String, Value>,
    /// Name shown to other participants.
    #[serde(default)]
    pub display_name: String,
    /// Stable identifier used in join/leave reports.
    #[serde(default)]
    pub meeting_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_title: Option<String>,
    #[serde(default)]
    pub time_window: TimeWindowStatus,
    #[serde(default)]
    pub participant_role: ParticipantRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_app_id: Option<String>,
}

/// What the widget should show for a descriptor, before any user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presence {
    /// No room, meeting ended, or no meeting: render nothing, ever.
    Hidden,
    /// Too early and outside the waiting threshold: render nothing for now.
    Dormant,
    /// Inside the waiting threshold: show a countdown.
    Countdown { minutes: u32 },
    /// Joining is permitted right now.
    Joinable,
}

impl MeetingDescriptor {
    /// Creates a joinable descriptor for the given room.
    pub fn new(room: impl Into<String>, meeting_id: impl Into<String>) -> Self {
        Self {
            can_join_now: true,
            room_identifier: Some(room.into()),
            meeting_id: meeting_id.into(),
            ..Default::default()
        }
    }

    /// Builder: set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Builder: set the meeting title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meeting_title = Some(title.into());
        self
    }

    /// Builder: replace the time window, updating `can_join_now` to match.
    pub fn with_time_window(mut self, window: TimeWindowStatus) -> Self {
        self.can_join_now = window.reason.is_none();
        self.time_window = window;
        self
    }

    /// Builder: set the auth token.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Builder: set the provider application (tenant) id.
    pub fn with_provider_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.provider_app_id = Some(app_id.into());
        self
    }

    /// Builder: set the participant role.
    pub fn with_role(mut self, role: ParticipantRole) -> Self {
        self.participant_role = role;
        self
    }

    /// Returns the room identifier if a connection may ever be created.
    pub fn connectable_room(&self) -> Option<&str> {
        if self.time_window.is_closed() {
            return None;
        }
        self.room_identifier.as_deref().filter(|room| !room.is_empty())
    }

    /// Derives the presence for this descriptor.
    pub fn presence(&self, waiting_threshold_minutes: u32) -> Presence {
        if self.connectable_room().is_none() {
            return Presence::Hidden;
        }
        if self.can_join_now {
            return Presence::Joinable;
        }
        match (self.time_window.reason, self.time_window.minutes_until_start) {
            (Some(WindowReason::TooEarly), Some(minutes))
                if minutes <= i64::from(waiting_threshold_minutes) =>
            {
                Presence::Countdown {
                    minutes: minutes.max(0) as u32,
                }
            }
            _ => Presence::Dormant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn too_early(minutes: i64) -> MeetingDescriptor {
        MeetingDescriptor::new("room", "m-1").with_time_window(TimeWindowStatus::too_early(minutes))
    }

    #[test]
    fn missing_room_is_hidden() {
        let mut descriptor = MeetingDescriptor::new("room", "m-1");
        descriptor.room_identifier = None;
        assert_eq!(descriptor.presence(30), Presence::Hidden);
    }

    #[test]
    fn closed_windows_are_hidden() {
        let ended = MeetingDescriptor::new("room", "m-1").with_time_window(TimeWindowStatus::ended());
        assert_eq!(ended.presence(30), Presence::Hidden);

        let mut none = MeetingDescriptor::new("room", "m-1");
        none.can_join_now = true;
        none.time_window.reason = Some(WindowReason::NoMeeting);
        assert_eq!(none.presence(30), Presence::Hidden);
    }

    #[test]
    fn threshold_boundary() {
        assert_eq!(too_early(45).presence(30), Presence::Dormant);
        assert_eq!(too_early(31).presence(30), Presence::Dormant);
        assert_eq!(too_early(30).presence(30), Presence::Countdown { minutes: 30 });
        assert_eq!(too_early(10).presence(30), Presence::Countdown { minutes: 10 });
    }

    #[test]
    fn too_early_without_minutes_is_dormant() {
        let mut descriptor = too_early(5);
        descriptor.time_window.minutes_until_start = None;
        assert_eq!(descriptor.presence(30), Presence::Dormant);
    }

    #[test]
    fn joinable_when_window_open() {
        let descriptor = MeetingDescriptor::new("room", "m-1").with_time_window(TimeWindowStatus::open(40));
        assert!(descriptor.can_join_now);
        assert_eq!(descriptor.presence(30), Presence::Joinable);
    }

    #[test]
    fn parses_host_json() {
        let json = r#"{
            "canJoinNow": false,
            "roomIdentifier": "lernraum-7",
            "connectionOptions": {"startWithAudioMuted": true},
            "uiOptions": {},
            "displayName": "Mia",
            "meetingId": "42",
            "timeWindow": {"reason": "too_early", "minutesUntilStart": 12},
            "participantRole": "coach",
            "providerAppId": "vpaas-magic-cookie-abc"
        }"#;
        let descriptor: MeetingDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.room_identifier.as_deref(), Some("lernraum-7"));
        assert_eq!(descriptor.participant_role, ParticipantRole::Coach);
        assert_eq!(descriptor.time_window.reason, Some(WindowReason::TooEarly));
        assert_eq!(
            descriptor.connection_options.get("startWithAudioMuted"),
            Some(&Value::Bool(true))
        );
        assert_eq!(descriptor.presence(30), Presence::Countdown { minutes: 12 });
    }

    #[test]
    fn null_room_parses_as_none() {
        let descriptor: MeetingDescriptor =
            serde_json::from_str(r#"{"roomIdentifier": null, "canJoinNow": true}"#).unwrap();
        assert!(descriptor.room_identifier.is_none());
        assert_eq!(descriptor.presence(30), Presence::Hidden);
    }
}
