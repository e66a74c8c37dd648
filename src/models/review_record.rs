//! One card queued for spaced review by one user.
use super::level::MIN_LEVEL;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type CardId = i64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub user_id: UserId,
    pub card_id: CardId,
    pub level: u8,
    pub due_date: NaiveDate,
    pub last_reviewed_date: Option<NaiveDate>,
}

impl ReviewRecord {
    /// A freshly enrolled record: level 1, due today, never reviewed.
    pub fn enrolled(user_id: UserId, card_id: CardId, today: NaiveDate) -> Self {
        Self {
            user_id,
            card_id,
            level: MIN_LEVEL,
            due_date: today,
            last_reviewed_date: None,
        }
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.due_date == date
    }

    /// True when the record was due the day before `as_of` and never advanced.
    pub fn is_stuck_since(&self, as_of: NaiveDate) -> bool {
        as_of
            .checked_sub_days(Days::new(1))
            .is_some_and(|yesterday| self.due_date == yesterday)
    }
}
