use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("User store error: {0}")]
    Users(#[from] routinely_users::UserError),

    #[error("Schedule store error: {0}")]
    Schedule(#[from] routinely_schedule::ScheduleError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ResetError>;
