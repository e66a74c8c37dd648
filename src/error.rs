//! Error types for scheduler operations.

use crate::models::{CardId, UserId};
use thiserror::Error;

/// Errors returned by the review scheduler.
///
/// Domain errors are ordinary values: callers branch on them to build
/// user-facing responses.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A record for this (user, card) pair already exists.
    #[error("user {user_id} is already enrolled on card {card_id}")]
    AlreadyEnrolled { user_id: UserId, card_id: CardId },

    /// No record for this (user, card) pair.
    #[error("no review record for user {user_id} and card {card_id}")]
    RecordNotFound { user_id: UserId, card_id: CardId },

    /// Fewer records are due today than were requested.
    #[error("requested {requested} due cards but only {available} are due")]
    InsufficientDueCards { requested: usize, available: usize },

    /// Level cap outside [1, 7].
    #[error("invalid level cap {0}, expected a value between 1 and 7")]
    InvalidLevelCap(i64),

    /// The record store is unavailable or failed. Never retried here.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<rusqlite::Error> for SchedulerError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulerError::PersistenceFailure(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
