//! Duration conversion and formatting utilities.
//!
//! Conversions saturate explicitly instead of truncating.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to seconds as u32, saturating at `u32::MAX`.
    fn as_secs_u32(&self) -> u32;

    /// Format as a player clock, `m:ss` (e.g. `2:35`, `61:05`).
    fn format_clock(&self) -> String;
}

impl DurationExt for Duration {
    fn as_secs_u32(&self) -> u32 {
        u32::try_from(self.as_secs()).unwrap_or(u32::MAX)
    }

    fn format_clock(&self) -> String {
        let secs = self.as_secs_u32();
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}
