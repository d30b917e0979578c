//! Application composition.
//!
//! The engine is wired exactly once at process start: achievements feed
//! settlement, settlement feeds the lifecycle, the lifecycle feeds condition
//! tracking. Embedders construct an [`App`] with their store and notifier
//! implementations and call the public hooks from their own triggers.

use std::sync::Arc;

use potluck_domain::{ConditionId, EventId, UserId};

use crate::infrastructure::clock::{SystemClock, SystemRandom};
use crate::infrastructure::ports::{
    AchievementRepo, ClockPort, ConditionRepo, EventRepo, ParticipationRepo, RandomPort,
    TransactionRepo, UpdateNotifier,
};
use crate::use_cases::{AchievementTracker, ConditionTracker, EventLifecycle, Settlement};

/// The five persistence ports the engine reads and writes.
pub struct Stores {
    pub events: Arc<dyn EventRepo>,
    pub conditions: Arc<dyn ConditionRepo>,
    pub participations: Arc<dyn ParticipationRepo>,
    pub ledger: Arc<dyn TransactionRepo>,
    pub achievements: Arc<dyn AchievementRepo>,
}

/// The wired engine. One instance per process.
pub struct App {
    pub conditions: Arc<ConditionTracker>,
    pub lifecycle: Arc<EventLifecycle>,
    pub settlement: Arc<Settlement>,
    pub achievements: Arc<AchievementTracker>,
}

impl App {
    pub fn new(
        stores: Stores,
        notifier: Arc<dyn UpdateNotifier>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let achievements = Arc::new(AchievementTracker::new(
            stores.achievements.clone(),
            clock.clone(),
        ));
        let settlement = Arc::new(Settlement::new(
            stores.events.clone(),
            stores.participations.clone(),
            stores.ledger.clone(),
            achievements.clone(),
            notifier.clone(),
            clock.clone(),
            random,
        ));
        let lifecycle = Arc::new(EventLifecycle::new(
            stores.events.clone(),
            stores.conditions.clone(),
            notifier.clone(),
            clock.clone(),
            settlement.clone(),
        ));
        let conditions = Arc::new(ConditionTracker::new(
            stores.conditions,
            stores.participations,
            notifier,
            clock,
            lifecycle.clone(),
        ));
        Self {
            conditions,
            lifecycle,
            settlement,
            achievements,
        }
    }

    /// Wire against the real clock and RNG.
    pub fn with_system_defaults(stores: Stores, notifier: Arc<dyn UpdateNotifier>) -> Self {
        Self::new(
            stores,
            notifier,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
        )
    }

    /// A user joined the event for the first time: credit the join and
    /// re-evaluate the event.
    pub async fn on_participation_created(&self, event_id: EventId, user_id: UserId) {
        if let Err(e) = self.achievements.track_event_participated(user_id).await {
            tracing::warn!(error = %e, user_id = %user_id, "Participation achievement update failed");
        }
        self.conditions.check_event_conditions(event_id).await;
    }

    /// An existing participation was topped up. Deposits accumulate onto the
    /// same row, so no join is credited; only the conditions are re-evaluated.
    pub async fn on_deposit_added(&self, event_id: EventId) {
        self.conditions.check_event_conditions(event_id).await;
    }

    /// An event was created by a collaborator.
    pub async fn on_event_created(&self, creator_id: UserId) {
        if let Err(e) = self.achievements.track_event_created(creator_id).await {
            tracing::warn!(error = %e, user_id = %creator_id, "Creation achievement update failed");
        }
    }

    /// The external scheduler's periodic tick for one TIME condition.
    pub async fn on_time_check(&self, condition_id: ConditionId, event_id: EventId) {
        self.conditions.check_condition(condition_id, event_id).await;
    }

    /// A user's consecutive-active-days streak changed.
    pub async fn on_activity_streak(&self, user_id: UserId, streak_days: i64) {
        if let Err(e) = self
            .achievements
            .track_activity_streak(user_id, streak_days)
            .await
        {
            tracing::warn!(error = %e, user_id = %user_id, "Streak achievement update failed");
        }
    }

    /// A user's account balance changed.
    pub async fn on_bank_balance_changed(&self, user_id: UserId, balance: i64) {
        if let Err(e) = self.achievements.track_bank_balance(user_id, balance).await {
            tracing::warn!(error = %e, user_id = %user_id, "Balance achievement update failed");
        }
    }
}
