//! Outcomes of batch operations.
use super::{CardId, UserId};
use chrono::NaiveDate;

/// One record the catch-up sweep could not persist.
#[derive(Debug)]
pub struct SweepFailure {
    pub user_id: UserId,
    pub card_id: CardId,
    pub reason: String,
}

/// Summary of one catch-up sweep run.
#[derive(Debug)]
pub struct SweepReport {
    pub as_of: NaiveDate,
    /// Records found stuck on the previous day.
    pub examined: usize,
    pub rescheduled: usize,
    /// Records answered between listing and update; left untouched.
    pub skipped: usize,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            examined: 0,
            rescheduled: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnrollSummary {
    pub enrolled: usize,
    /// Cards the user was already reviewing.
    pub skipped: usize,
}
