//! Error types for Tally Core

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Poll expired: {0}")]
    PollExpired(String),

    #[error("Invalid option {index}: poll has {option_count} options")]
    InvalidOption { index: i64, option_count: usize },

    #[error("Already voted on poll {poll_id}")]
    AlreadyVoted { poll_id: String, option_index: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Discriminated outcome kind reported to adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    PollExpired,
    InvalidOption,
    AlreadyVoted,
    Storage,
}

impl ErrorKind {
    /// Stable code string for wire formats
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::PollExpired => "POLL_EXPIRED",
            ErrorKind::InvalidOption => "INVALID_OPTION",
            ErrorKind::AlreadyVoted => "ALREADY_VOTED",
            ErrorKind::Storage => "STORAGE_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::PollExpired(_) => ErrorKind::PollExpired,
            Error::InvalidOption { .. } => ErrorKind::InvalidOption,
            Error::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            Error::Database(_) | Error::Io(_) | Error::Serialization(_) | Error::Storage(_) => {
                ErrorKind::Storage
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
