use routinely_core::page::PageError;
use thiserror::Error;

/// Errors surfaced by the scheduling engine.
///
/// `TimeConflict` and `NotFound` are expected, frequent, user-facing outcomes;
/// the transport collaborator maps them to status codes. Nothing here is fatal
/// to the process.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Malformed wall-clock string (must be zero-padded HH:MM, 00:00–23:59).
    #[error("Time must be in HH:MM format, got {0:?}")]
    InvalidTime(String),

    /// Malformed hex color tag (expects #RGB or #RRGGBB).
    #[error("Color must be a hex string like #RRGGBB, got {0:?}")]
    InvalidColor(String),

    /// Missing required field, empty patch, or unknown category.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Interval end is not strictly after its start.
    #[error("Interval end {end} must be after start {start}")]
    InvalidInterval { start: String, end: String },

    /// The interval overlaps an existing activity in the same day bucket.
    #[error("Time conflict with existing activity")]
    TimeConflict,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Ownership mismatch on a completion toggle.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The versioned routine write lost to concurrent writers on every retry.
    /// Transient — callers may simply retry the operation.
    #[error("Storage contention: gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScheduleError {
    /// Short stable code string for the transport layer's status mapping.
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::InvalidTime(_) => "INVALID_TIME",
            ScheduleError::InvalidColor(_) => "INVALID_COLOR",
            ScheduleError::InvalidInput(_) => "INVALID_INPUT",
            ScheduleError::InvalidInterval { .. } => "INVALID_INTERVAL",
            ScheduleError::TimeConflict => "TIME_CONFLICT",
            ScheduleError::NotFound(_) => "NOT_FOUND",
            ScheduleError::Forbidden(_) => "FORBIDDEN",
            ScheduleError::Contention { .. } => "CONTENTION",
            ScheduleError::Database(_) => "DATABASE_ERROR",
            ScheduleError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<PageError> for ScheduleError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::NonPositive => ScheduleError::InvalidInput(e.to_string()),
            PageError::OutOfRange { .. } => ScheduleError::NotFound(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
