//! `routinely-stats` — read-only rollups over activities, archival records
//! and user profiles.
//!
//! Pure read/group/sort pipelines: per-category totals, per-day category
//! breakdowns, and demographic histograms with the shared offset-pagination
//! contract. Nothing here mutates state or runs conflict logic.

pub mod aggregator;
pub mod error;
pub mod types;

pub use aggregator::StatsAggregator;
pub use error::{Result, StatsError};
pub use types::{
    BirthYearStats, CategoryDuration, CategoryStats, DayStats, NationalityStats,
    RegistrationStats, SummaryStats,
};
