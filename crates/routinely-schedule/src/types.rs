use routinely_core::types::{Category, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::interval::{TimeInterval, WallClock};

/// Color applied when the caller does not pick one — the single optional
/// field on activity creation.
pub const DEFAULT_COLOR: &str = "#9e9e9e";

/// Accepts `#RGB` and `#RRGGBB`.
pub fn validate_color(s: &str) -> Result<()> {
    let hex = s
        .strip_prefix('#')
        .ok_or_else(|| ScheduleError::InvalidColor(s.to_string()))?;
    if (hex.len() == 3 || hex.len() == 6) && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ScheduleError::InvalidColor(s.to_string()))
    }
}

/// One scheduled item inside a day bucket.
///
/// The interval is private so duration can never drift from it: every
/// interval change goes through [`Activity::set_interval`], which recomputes
/// `duration_minutes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// UUIDv7 string — stable across updates.
    pub id: String,
    pub routine_id: String,
    pub weekday: Weekday,
    #[serde(flatten)]
    pub(crate) interval: TimeInterval,
    pub duration_minutes: u32,
    pub label: String,
    pub category: Category,
    pub color: String,
    pub is_completed: bool,
    pub created_at: String,
}

impl Activity {
    pub fn new(
        routine_id: &str,
        weekday: Weekday,
        interval: TimeInterval,
        label: &str,
        category: Category,
        color: &str,
        created_at: &str,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            routine_id: routine_id.to_string(),
            weekday,
            interval,
            duration_minutes: interval.duration_minutes(),
            label: label.to_string(),
            category,
            color: color.to_string(),
            is_completed: false,
            created_at: created_at.to_string(),
        }
    }

    pub fn interval(&self) -> &TimeInterval {
        &self.interval
    }

    /// Replace the interval and recompute the derived duration.
    pub fn set_interval(&mut self, interval: TimeInterval) {
        self.interval = interval;
        self.duration_minutes = interval.duration_minutes();
    }
}

/// Creation input as decoded by the transport layer. Times, category and
/// color arrive as raw strings; the engine owns their validation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub start: String,
    pub end: String,
    pub label: String,
    pub category: String,
    pub color: Option<String>,
}

/// Partial update input. Absent fields keep their current values; an
/// all-absent patch is rejected before any store access.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPatch {
    pub start: Option<String>,
    pub end: Option<String>,
    pub label: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
            && self.end.is_none()
            && self.label.is_none()
            && self.category.is_none()
            && self.color.is_none()
    }
}

/// The patch after field-level validation — what the bucket actually applies.
#[derive(Debug, Clone, Default)]
pub struct ValidatedPatch {
    pub start: Option<WallClock>,
    pub end: Option<WallClock>,
    pub label: Option<String>,
    pub category: Option<Category>,
    pub color: Option<String>,
}

/// Archival snapshot written when an activity is marked complete. Lives in
/// its own collection; deleting or editing the live activity leaves it alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedActivity {
    /// UUIDv7 string — primary key.
    pub id: String,
    pub activity_id: String,
    pub label: String,
    pub duration_minutes: u32,
    pub category: Category,
    pub completed_at: String,
}

impl CompletedActivity {
    pub fn snapshot(activity: &Activity, completed_at: &str) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            activity_id: activity.id.clone(),
            label: activity.label.clone(),
            duration_minutes: activity.duration_minutes,
            category: activity.category,
            completed_at: completed_at.to_string(),
        }
    }
}
