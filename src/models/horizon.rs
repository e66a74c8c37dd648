use super::UserId;
use serde::{Deserialize, Serialize};

/// What is left to review for a user, seen from one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewHorizon {
    pub due_today: usize,
    /// Whole days until the next scheduled review. Only set when nothing is
    /// due today and something is scheduled later.
    pub next_due_in_days: Option<i64>,
}

impl ReviewHorizon {
    pub fn is_caught_up(&self) -> bool {
        self.due_today == 0 && self.next_due_in_days.is_none()
    }
}

/// A user with reviews due on a given day, for the notification dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueReminder {
    pub user_id: UserId,
    pub due_count: usize,
}
