//! Error types for recurrence-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    /// The event cannot be expanded at all: missing DTSTART, an unparseable
    /// literal, or a recurrence rule the evaluator rejects.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Invalid content line: {0}")]
    InvalidContentLine(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

pub type Result<T> = std::result::Result<T, RecurrenceError>;
