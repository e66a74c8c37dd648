//! Persistence seams used by the scheduler.
//!
//! The scheduler only talks to these traits; `db::SqliteStore` is the
//! SQLite-backed implementation used by the binaries and the tests.

pub mod db;

use crate::error::Result;
use crate::models::{CardId, LevelCap, ReviewRecord, UserId};
use chrono::NaiveDate;

/// Result of an atomic read-modify-write on one record.
#[derive(Debug, PartialEq, Eq)]
pub enum Modified {
    /// No record for the key.
    Missing,
    /// The update declined to change the record.
    Unchanged(ReviewRecord),
    Updated(ReviewRecord),
}

/// Storage for review records keyed by (user, card).
pub trait ReviewStore {
    /// Inserts a new record. Fails with `AlreadyEnrolled` if the key exists.
    fn insert_new(&self, record: &ReviewRecord) -> Result<()>;

    fn find(&self, user_id: UserId, card_id: CardId) -> Result<Option<ReviewRecord>>;

    /// Reads the record and writes back whatever `update` returns, as one
    /// transaction. Returning `None` from `update` leaves the record as is.
    fn modify(
        &self,
        user_id: UserId,
        card_id: CardId,
        update: &mut dyn FnMut(&ReviewRecord) -> Option<ReviewRecord>,
    ) -> Result<Modified>;

    /// Every record of a user, ordered by due date then card id.
    fn records_for_user(&self, user_id: UserId) -> Result<Vec<ReviewRecord>>;

    fn due_for_user(&self, user_id: UserId, date: NaiveDate) -> Result<Vec<ReviewRecord>>;

    /// Records of every user due on `date`.
    fn due_on(&self, date: NaiveDate) -> Result<Vec<ReviewRecord>>;

    /// Earliest due date strictly after `date` for a user.
    fn next_due_after(&self, user_id: UserId, date: NaiveDate) -> Result<Option<NaiveDate>>;

    /// Per-user number of records due on `date`, ordered by user id.
    fn due_counts_on(&self, date: NaiveDate) -> Result<Vec<(UserId, usize)>>;

    fn delete_for_cards(&self, card_ids: &[CardId]) -> Result<usize>;

    fn delete_for_user_cards(&self, user_id: UserId, card_ids: &[CardId]) -> Result<usize>;

    fn delete_for_user(&self, user_id: UserId) -> Result<usize>;
}

/// User profile collaborator supplying the per-user level cap.
pub trait ProfileSource {
    fn level_cap(&self, user_id: UserId) -> Result<LevelCap>;
}
