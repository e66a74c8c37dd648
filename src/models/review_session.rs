//! A single pass over the cards selected for today's review.
//!
//! Each card is answered once; the answer goes straight to the scheduler, which
//! moves the card to its next due date. A missed card comes back tomorrow, not
//! later in the same session.

use super::{CatalogCard, ReviewRecord, ThemeSnapshot, UserId};
use crate::database::{ProfileSource, ReviewStore};
use crate::error::Result;
use crate::scheduler::Scheduler;
use chrono::NaiveDate;

pub struct SessionCard {
    pub record: ReviewRecord,
    /// Catalog text, if the card is still in a known theme.
    pub card: Option<CatalogCard>,
    pub answered: Option<bool>,
}

pub struct ReviewSession {
    pub user_id: UserId,
    pub today: NaiveDate,
    pub cards: Vec<SessionCard>,
    pub current_index: usize,
    pub show_back: bool,
}

impl ReviewSession {
    /// Builds a session from selected records, looking their text up in `themes`.
    pub fn new(
        user_id: UserId,
        today: NaiveDate,
        records: Vec<ReviewRecord>,
        themes: &[ThemeSnapshot],
    ) -> Self {
        let cards = records
            .into_iter()
            .map(|record| {
                let card = themes
                    .iter()
                    .find_map(|theme| theme.card(record.card_id))
                    .cloned();
                SessionCard {
                    record,
                    card,
                    answered: None,
                }
            })
            .collect();

        Self {
            user_id,
            today,
            cards,
            current_index: 0,
            show_back: false,
        }
    }

    pub fn current_card(&self) -> Option<&SessionCard> {
        self.cards.get(self.current_index)
    }

    pub fn toggle_back(&mut self) {
        self.show_back = !self.show_back;
    }

    /// Sends the answer for the current card to the scheduler and moves on.
    pub fn answer_current<S: ReviewStore, P: ProfileSource>(
        &mut self,
        correct: bool,
        scheduler: &Scheduler<S, P>,
    ) -> Result<()> {
        let Some(current) = self.cards.get_mut(self.current_index) else {
            return Ok(());
        };

        let updated = scheduler.apply_outcome(
            current.record.user_id,
            current.record.card_id,
            correct,
            self.today,
        )?;
        current.record = updated;
        current.answered = Some(correct);

        self.current_index += 1;
        self.show_back = false;
        Ok(())
    }

    pub fn correct_count(&self) -> usize {
        self.cards.iter().filter(|c| c.answered == Some(true)).count()
    }

    pub fn answered_count(&self) -> usize {
        self.cards.iter().filter(|c| c.answered.is_some()).count()
    }

    pub fn total_count(&self) -> usize {
        self.cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.answered_count()
    }

    pub fn is_completed(&self) -> bool {
        self.current_index >= self.cards.len()
    }
}
