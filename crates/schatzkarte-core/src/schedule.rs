//! Computing a [`TimeWindowStatus`] from a meeting's schedule.
//!
//! Hosts usually compute the time window server-side and send it with the
//! descriptor. This helper does the same computation locally so a host (or the
//! CLI) can refresh `can_join_now` and the minute counters between fetches.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::meeting::{MeetingDescriptor, TimeWindowStatus};

/// Start/end of a meeting plus how early joining opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSchedule {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Minutes before `starts_at` at which joining is allowed.
    #[serde(default = "default_join_lead_minutes")]
    pub join_lead_minutes: i64,
}

fn default_join_lead_minutes() -> i64 {
    5
}

/// Whole minutes from `from` to `to`, rounded up.
fn minutes_ceil(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let secs = (to - from).num_seconds();
    if secs <= 0 {
        0
    } else {
        (secs + 59) / 60
    }
}

impl MeetingSchedule {
    pub fn new(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        Self {
            starts_at,
            ends_at,
            join_lead_minutes: default_join_lead_minutes(),
        }
    }

    /// Builder: set the join lead time.
    pub fn with_join_lead(mut self, minutes: i64) -> Self {
        self.join_lead_minutes = minutes.max(0);
        self
    }

    /// Returns the moment joining opens.
    ///
    /// Negative leads count as zero. A lead reaching past the representable
    /// range opens the meeting from the earliest instant.
    pub fn opens_at(&self) -> DateTime<Utc> {
        Duration::try_minutes(self.join_lead_minutes.max(0))
            .and_then(|lead| self.starts_at.checked_sub_signed(lead))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns `(can_join_now, status)` at `now`.
    pub fn evaluate(&self, now: DateTime<Utc>) -> (bool, TimeWindowStatus) {
        if now >= self.ends_at {
            return (false, TimeWindowStatus::ended());
        }
        if now < self.opens_at() {
            return (false, TimeWindowStatus::too_early(minutes_ceil(now, self.starts_at)));
        }
        (true, TimeWindowStatus::open(minutes_ceil(now, self.ends_at)))
    }

    /// Writes the evaluation at `now` into `descriptor`.
    pub fn apply(&self, descriptor: &mut MeetingDescriptor, now: DateTime<Utc>) {
        let (can_join_now, status) = self.evaluate(now);
        descriptor.can_join_now = can_join_now;
        descriptor.time_window = status;
    }
}
