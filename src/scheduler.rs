//! The review scheduler.
//!
//! Owns the lifecycle of review records: enrollment, answer outcomes, the daily
//! catch-up sweep, due-card selection and horizon queries. Every operation is
//! handed the date it runs for; nothing here reads the system clock.

use crate::database::{Modified, ProfileSource, ReviewStore};
use crate::error::{Result, SchedulerError};
use crate::models::leveled::{apply_outcome, catch_up};
use crate::models::{
    CardId, DueReminder, EnrollSummary, ReviewHorizon, ReviewRecord, SweepFailure, SweepReport,
    ThemeProgress, ThemeSnapshot, UserId,
};
use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub struct Scheduler<S, P> {
    store: S,
    profiles: P,
}

impl<S: ReviewStore, P: ProfileSource> Scheduler<S, P> {
    pub fn new(store: S, profiles: P) -> Self {
        Self { store, profiles }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Queues a card for review by a user, due today at level 1.
    pub fn enroll(
        &self,
        user_id: UserId,
        card_id: CardId,
        today: NaiveDate,
    ) -> Result<ReviewRecord> {
        let record = ReviewRecord::enrolled(user_id, card_id, today);
        self.store.insert_new(&record)?;
        debug!(user_id, card_id, %today, "card enrolled");
        Ok(record)
    }

    /// Enrolls every card of a theme snapshot. Cards the user already reviews
    /// are skipped; any other failure stops the batch.
    pub fn enroll_theme(
        &self,
        user_id: UserId,
        theme: &ThemeSnapshot,
        today: NaiveDate,
    ) -> Result<EnrollSummary> {
        let mut summary = EnrollSummary::default();
        for card_id in theme.card_ids() {
            match self.enroll(user_id, card_id, today) {
                Ok(_) => summary.enrolled += 1,
                Err(SchedulerError::AlreadyEnrolled { .. }) => summary.skipped += 1,
                Err(err) => return Err(err),
            }
        }

        info!(
            user_id,
            theme_id = theme.id,
            enrolled = summary.enrolled,
            skipped = summary.skipped,
            "theme enrolled"
        );
        Ok(summary)
    }

    /// Records an answer for a card and schedules its next review.
    pub fn apply_outcome(
        &self,
        user_id: UserId,
        card_id: CardId,
        correct: bool,
        today: NaiveDate,
    ) -> Result<ReviewRecord> {
        let cap = self.profiles.level_cap(user_id)?;

        let modified = self.store.modify(user_id, card_id, &mut |record| {
            Some(apply_outcome(record, correct, cap, today))
        })?;

        match modified {
            Modified::Updated(record) | Modified::Unchanged(record) => {
                debug!(
                    user_id,
                    card_id,
                    correct,
                    level = record.level,
                    due_date = %record.due_date,
                    "outcome applied"
                );
                Ok(record)
            }
            Modified::Missing => Err(SchedulerError::RecordNotFound { user_id, card_id }),
        }
    }

    /// Reschedules every record that was due the day before `as_of` and never
    /// answered, keeping its level.
    ///
    /// A record that fails to persist is logged and reported; the sweep moves on
    /// to the next one. Running it again for the same `as_of` changes nothing.
    pub fn catch_up_sweep(&self, as_of: NaiveDate) -> Result<SweepReport> {
        let mut report = SweepReport::new(as_of);
        let Some(yesterday) = as_of.pred_opt() else {
            return Ok(report);
        };

        let stuck = self.store.due_on(yesterday)?;
        report.examined = stuck.len();

        for record in stuck {
            let (user_id, card_id) = (record.user_id, record.card_id);
            match self
                .store
                .modify(user_id, card_id, &mut |current| catch_up(current, as_of))
            {
                Ok(Modified::Updated(_)) => report.rescheduled += 1,
                Ok(Modified::Unchanged(_) | Modified::Missing) => report.skipped += 1,
                Err(err) => {
                    warn!(user_id, card_id, error = %err, "failed to reschedule missed review");
                    report.failures.push(SweepFailure {
                        user_id,
                        card_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            %as_of,
            examined = report.examined,
            rescheduled = report.rescheduled,
            skipped = report.skipped,
            failures = report.failure_count(),
            "catch-up sweep finished"
        );
        Ok(report)
    }

    /// Picks `count` of the user's records due today, uniformly at random.
    pub fn select_due_cards(
        &self,
        user_id: UserId,
        count: usize,
        today: NaiveDate,
    ) -> Result<Vec<ReviewRecord>> {
        self.select_due_cards_with(user_id, count, today, &mut rand::thread_rng())
    }

    pub fn select_due_cards_with<R: Rng + ?Sized>(
        &self,
        user_id: UserId,
        count: usize,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<Vec<ReviewRecord>> {
        let due = self.store.due_for_user(user_id, today)?;
        if count > due.len() {
            return Err(SchedulerError::InsufficientDueCards {
                requested: count,
                available: due.len(),
            });
        }

        let mut picked: Vec<ReviewRecord> = due.choose_multiple(rng, count).cloned().collect();
        picked.shuffle(rng);
        Ok(picked)
    }

    pub fn next_review_horizon(&self, user_id: UserId, today: NaiveDate) -> Result<ReviewHorizon> {
        let due_today = self.store.due_for_user(user_id, today)?.len();
        if due_today > 0 {
            return Ok(ReviewHorizon {
                due_today,
                next_due_in_days: None,
            });
        }

        let next_due_in_days = self
            .store
            .next_due_after(user_id, today)?
            .map(|next| (next - today).num_days());

        Ok(ReviewHorizon {
            due_today,
            next_due_in_days,
        })
    }

    /// Users with at least one review due on `date`.
    pub fn reminder_targets(&self, date: NaiveDate) -> Result<Vec<DueReminder>> {
        let targets = self
            .store
            .due_counts_on(date)?
            .into_iter()
            .filter(|&(_, due_count)| due_count > 0)
            .map(|(user_id, due_count)| DueReminder { user_id, due_count })
            .collect();
        Ok(targets)
    }

    pub fn records_for_user(&self, user_id: UserId) -> Result<Vec<ReviewRecord>> {
        self.store.records_for_user(user_id)
    }

    /// Themes the user has at least one card under review in, in catalog order.
    pub fn reviewed_themes(
        &self,
        user_id: UserId,
        themes: &[ThemeSnapshot],
    ) -> Result<Vec<ThemeProgress>> {
        let reviewed: HashSet<CardId> = self
            .store
            .records_for_user(user_id)?
            .into_iter()
            .map(|record| record.card_id)
            .collect();

        let progress = themes
            .iter()
            .map(|theme| ThemeProgress {
                theme_id: theme.id,
                reviewed_cards: theme
                    .cards
                    .iter()
                    .filter(|card| reviewed.contains(&card.id))
                    .count(),
                total_cards: theme.cards.len(),
            })
            .filter(|progress| progress.reviewed_cards > 0)
            .collect();
        Ok(progress)
    }

    /// Drops every user's records for cards removed from the catalog.
    pub fn remove_records_for_cards(&self, card_ids: &[CardId]) -> Result<usize> {
        let removed = self.store.delete_for_cards(card_ids)?;
        info!(cards = card_ids.len(), removed, "review records removed for deleted cards");
        Ok(removed)
    }

    /// Stops reviewing a theme: drops one user's records for its cards.
    pub fn remove_theme_for_user(&self, user_id: UserId, card_ids: &[CardId]) -> Result<usize> {
        let removed = self.store.delete_for_user_cards(user_id, card_ids)?;
        info!(user_id, removed, "theme removed from reviews");
        Ok(removed)
    }

    pub fn remove_all_for_user(&self, user_id: UserId) -> Result<usize> {
        let removed = self.store.delete_for_user(user_id)?;
        info!(user_id, removed, "all review records removed");
        Ok(removed)
    }
}
