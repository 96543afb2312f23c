//! Error types for mailroom.

use thiserror::Error;

/// Common error type for mailroom.
#[derive(Error, Debug)]
pub enum MailroomError {
    /// An entry with the same recipient, title, content, campaign and
    /// insertion time already exists.
    #[error("entry with given payload already exists")]
    Duplicate,

    /// Database error.
    ///
    /// This is a generic database error that wraps errors from any database backend.
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Campaign delivery failed before any entry was removed.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for MailroomError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                MailroomError::Duplicate
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                MailroomError::DatabaseConnection(e.to_string())
            }
            _ => MailroomError::Database(e.to_string()),
        }
    }
}

impl From<crate::entry::CursorError> for MailroomError {
    fn from(e: crate::entry::CursorError) -> Self {
        MailroomError::Validation(e.to_string())
    }
}

/// Result type alias for mailroom operations.
pub type Result<T> = std::result::Result<T, MailroomError>;
