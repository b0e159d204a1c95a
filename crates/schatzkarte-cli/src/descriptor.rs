//! Descriptor files read by `view` and `simulate`.
//!
//! A descriptor file is the JSON the host page would pass to the widget,
//! optionally extended with a `schedule` object. When a schedule is present the
//! time window is recomputed at the requested instant, so the same file can be
//! replayed at different points of a meeting.

use std::path::Path;

use chrono::{DateTime, Utc};
use schatzkarte_core::{MeetingDescriptor, MeetingSchedule};
use serde::Deserialize;
use tracing::debug;

use crate::error::{CliError, CliResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorFile {
    #[serde(flatten)]
    descriptor: MeetingDescriptor,
    #[serde(default)]
    schedule: Option<MeetingSchedule>,
}

/// Reads a descriptor file and evaluates its schedule at `at` (default: now).
pub fn load(path: &Path, at: Option<DateTime<Utc>>) -> CliResult<MeetingDescriptor> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CliError::descriptor(path, e.to_string()))?;
    parse(&content, at).map_err(|e| CliError::descriptor(path, e.to_string()))
}

fn parse(content: &str, at: Option<DateTime<Utc>>) -> Result<MeetingDescriptor, serde_json::Error> {
    let file: DescriptorFile = serde_json::from_str(content)?;
    let mut descriptor = file.descriptor;
    if let Some(schedule) = file.schedule {
        let now = at.unwrap_or_else(Utc::now);
        schedule.apply(&mut descriptor, now);
        debug!(
            %now,
            can_join_now = descriptor.can_join_now,
            window = ?descriptor.time_window,
            "Evaluated descriptor schedule"
        );
    }
    Ok(descriptor)
}
