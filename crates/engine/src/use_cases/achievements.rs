//! Achievement progress tracking.
//!
//! Receives discrete domain events (event completed, event created, user
//! activity, balance change) and updates per-user, per-criterion progress
//! records. Each criterion kind maps to one update policy: counters
//! increment, records take the max, absolute quantities are set. An
//! achievement unlocks once every one of its criteria is completed.
//!
//! Failure policy: progress tracking is strictly best-effort. A failing
//! update for one user is logged and never blocks sibling users in the same
//! fan-out, nor the settlement flow that triggered it.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use potluck_domain::{
    CriterionKind, EventId, ProgressUpdate, UserAchievement, UserId,
};

use crate::infrastructure::ports::{AchievementRepo, ClockPort, StoreError};

/// Snapshot of a finished event handed to the event-completed hook.
#[derive(Debug, Clone)]
pub struct CompletedEventOutcome {
    pub event_id: EventId,
    pub creator_id: UserId,
    /// Who the payout went to (fixed recipient or drawn jackpot winner)
    pub recipient_id: UserId,
    /// Payout amount credited to the recipient
    pub payout: i64,
    pub bank_amount: f64,
    pub participants_count: i64,
    pub completed_at: DateTime<Utc>,
}

/// Updates achievement progress in response to domain events.
pub struct AchievementTracker {
    achievement_repo: Arc<dyn AchievementRepo>,
    clock: Arc<dyn ClockPort>,
}

impl AchievementTracker {
    pub fn new(achievement_repo: Arc<dyn AchievementRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            achievement_repo,
            clock,
        }
    }

    /// Fan out progress updates for a finished event.
    ///
    /// Every participant is credited with the event's totals; the payout
    /// recipient additionally gets income updates. Recipient and creator are
    /// tracked once more only when they are not already a participant, so
    /// nobody is counted twice.
    #[instrument(skip(self, outcome, participant_ids), fields(event_id = %outcome.event_id))]
    pub async fn track_event_completed(
        &self,
        outcome: &CompletedEventOutcome,
        participant_ids: &[UserId],
    ) {
        let mut users: Vec<UserId> = participant_ids.to_vec();
        for extra in [outcome.recipient_id, outcome.creator_id] {
            if !users.contains(&extra) {
                users.push(extra);
            }
        }

        for user_id in users {
            let income = if user_id == outcome.recipient_id {
                outcome.payout
            } else {
                0
            };
            if let Err(e) = self.track_completed_for_user(user_id, outcome, income).await {
                warn!(
                    error = %e,
                    user_id = %user_id,
                    event_id = %outcome.event_id,
                    "Achievement update failed for user, continuing with the rest"
                );
            }
        }
    }

    /// One user's share of an event-completed fan-out.
    async fn track_completed_for_user(
        &self,
        user_id: UserId,
        outcome: &CompletedEventOutcome,
        income: i64,
    ) -> Result<(), StoreError> {
        let at = outcome.completed_at;
        self.update_progress(
            user_id,
            CriterionKind::CompletedEventBank,
            ProgressUpdate::Max(outcome.bank_amount.floor() as i64),
            at,
        )
        .await?;
        self.update_progress(
            user_id,
            CriterionKind::CompletedEventPeople,
            ProgressUpdate::Max(outcome.participants_count),
            at,
        )
        .await?;
        self.update_progress(
            user_id,
            CriterionKind::CompletedEventTime,
            ProgressUpdate::Increment(1),
            at,
        )
        .await?;
        if income > 0 {
            self.update_progress(
                user_id,
                CriterionKind::SingleEventIncome,
                ProgressUpdate::Max(income),
                at,
            )
            .await?;
            self.update_progress(
                user_id,
                CriterionKind::TotalIncome,
                ProgressUpdate::Increment(income),
                at,
            )
            .await?;
        }
        self.update_progress(
            user_id,
            CriterionKind::CompletedEventsCount,
            ProgressUpdate::Increment(1),
            at,
        )
        .await?;
        Ok(())
    }

    /// The user created an event.
    #[instrument(skip(self))]
    pub async fn track_event_created(&self, creator_id: UserId) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.update_progress(
            creator_id,
            CriterionKind::CreatedEventsCount,
            ProgressUpdate::Increment(1),
            now,
        )
        .await?;
        self.update_progress(
            creator_id,
            CriterionKind::AllEventsCount,
            ProgressUpdate::Increment(1),
            now,
        )
        .await
    }

    /// The user joined an event as a participant.
    #[instrument(skip(self))]
    pub async fn track_event_participated(&self, user_id: UserId) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.update_progress(
            user_id,
            CriterionKind::AllEventsCount,
            ProgressUpdate::Increment(1),
            now,
        )
        .await
    }

    /// The user's consecutive-active-days streak changed. A zero streak is
    /// not an observation and is skipped entirely.
    #[instrument(skip(self))]
    pub async fn track_activity_streak(
        &self,
        user_id: UserId,
        streak_days: i64,
    ) -> Result<(), StoreError> {
        if streak_days == 0 {
            return Ok(());
        }
        let now = self.clock.now();
        self.update_progress(
            user_id,
            CriterionKind::ActivityStreak,
            ProgressUpdate::Max(streak_days),
            now,
        )
        .await
    }

    /// The user's account balance changed.
    #[instrument(skip(self))]
    pub async fn track_bank_balance(
        &self,
        user_id: UserId,
        balance: i64,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.update_progress(
            user_id,
            CriterionKind::UserBankBalance,
            ProgressUpdate::Set(balance),
            now,
        )
        .await
    }

    /// Apply one observation to every criterion template of the given kind.
    async fn update_progress(
        &self,
        user_id: UserId,
        kind: CriterionKind,
        update: ProgressUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let criteria = self.achievement_repo.list_criteria_by_kind(kind).await?;
        for criterion in criteria {
            let mut user_achievement = self
                .achievement_repo
                .get_or_create_user_achievement(user_id, criterion.achievement_id)
                .await?;
            if user_achievement.is_unlocked {
                // Fully earned; progress underneath is frozen
                continue;
            }

            let mut progress = self
                .achievement_repo
                .get_or_create_progress(user_achievement.id, criterion.id)
                .await?;
            let was_completed = progress.is_completed;
            let newly_completed = progress.apply(update, criterion.target, now);
            if was_completed {
                continue;
            }
            self.achievement_repo.save_progress(&progress).await?;
            debug!(
                user_id = %user_id,
                criterion_id = %criterion.id,
                kind = %kind,
                value = progress.current_value,
                "Progress updated"
            );
            if newly_completed {
                info!(
                    user_id = %user_id,
                    criterion_id = %criterion.id,
                    kind = %kind,
                    "Criterion completed"
                );
                self.maybe_unlock(&mut user_achievement, now).await?;
            }
        }
        Ok(())
    }

    /// Unlock the achievement once every criterion has a completed progress
    /// record for this user.
    async fn maybe_unlock(
        &self,
        user_achievement: &mut UserAchievement,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let criteria = self
            .achievement_repo
            .list_criteria_for_achievement(user_achievement.achievement_id)
            .await?;
        let progress = self
            .achievement_repo
            .list_progress_for_user_achievement(user_achievement.id)
            .await?;
        let all_done = !criteria.is_empty()
            && criteria.iter().all(|criterion| {
                progress
                    .iter()
                    .any(|p| p.criterion_id == criterion.id && p.is_completed)
            });
        if all_done && user_achievement.unlock(now) {
            self.achievement_repo
                .save_user_achievement(user_achievement)
                .await?;
            info!(
                user_id = %user_achievement.user_id,
                achievement_id = %user_achievement.achievement_id,
                "Achievement unlocked"
            );
        }
        Ok(())
    }
}
