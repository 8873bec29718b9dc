use routinely_core::page::PageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    /// Empty source collection, or a page past the end.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<PageError> for StatsError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::NonPositive => StatsError::InvalidInput(e.to_string()),
            PageError::OutOfRange { .. } => StatsError::NotFound(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
