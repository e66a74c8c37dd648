//! Leveled exponential-backoff review algorithm.
//!
//! - A correct answer moves the record up one level, clamped to the user's cap
//! - A wrong answer resets the record to level 1 (no partial credit)
//! - The next due date is `today + 2^(level - 1)` days
//! - A review missed yesterday is pushed forward from yesterday at the same
//!   level; missing a day is not penalized the way a wrong answer is
//! - Due dates saturate at `NaiveDate::MAX`

use super::ReviewRecord;
use super::level::{LevelCap, MIN_LEVEL, interval_days};
use chrono::{Days, NaiveDate};

/// Calculates the record that results from answering it on `today`.
pub fn apply_outcome(
    record: &ReviewRecord,
    correct: bool,
    cap: LevelCap,
    today: NaiveDate,
) -> ReviewRecord {
    let max_level = cap.max_level();

    let new_level = if correct {
        record.level.saturating_add(1).min(max_level)
    } else {
        MIN_LEVEL
    };

    ReviewRecord {
        user_id: record.user_id,
        card_id: record.card_id,
        level: new_level,
        due_date: days_after(today, interval_days(new_level)),
        last_reviewed_date: Some(today),
    }
}

/// Reschedules a record that was due the day before `as_of` and not answered.
/// Returns `None` when the record is not stuck on yesterday.
pub fn catch_up(record: &ReviewRecord, as_of: NaiveDate) -> Option<ReviewRecord> {
    if !record.is_stuck_since(as_of) {
        return None;
    }
    let yesterday = record.due_date;

    Some(ReviewRecord {
        due_date: days_after(yesterday, interval_days(record.level)),
        last_reviewed_date: Some(yesterday),
        ..record.clone()
    })
}

fn days_after(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}
