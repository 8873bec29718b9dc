use routinely_core::types::{Category, Weekday};
use serde::{Deserialize, Serialize};

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_users: u64,
    /// Live activity rows (deletes shrink this).
    pub active_activities: u64,
    /// Archival records ever written (unmarks shrink this).
    pub completed_activities: u64,
    /// Sum of the never-decrementing lifetime counters across all routines.
    pub all_time_activities: u64,
    pub new_registrations_today: u64,
    pub activities_completed_today: u64,
}

/// Per-category rollup, sorted descending by total duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: Category,
    pub total_activities: u64,
    pub total_duration_minutes: u64,
    /// Mean minutes per activity, rounded to two decimals.
    pub duration_per_activity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDuration {
    pub category: Category,
    pub duration_minutes: u64,
}

/// One weekday's activity volume with its category breakdown
/// (categories sorted descending by duration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStats {
    pub day: Weekday,
    pub total_activities: u64,
    pub categories: Vec<CategoryDuration>,
}

/// Gender counts for one nationality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalityStats {
    pub nationality: String,
    pub total: u64,
    pub male: u64,
    pub female: u64,
    pub none: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthYearStats {
    pub year: i32,
    pub user_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStats {
    pub year: i32,
    pub month: u32,
    pub user_count: u64,
}
