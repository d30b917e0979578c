//! In-memory store implementations for development and testing.
//!
//! Keyed entities live in `DashMap`s; the ledger and the notifier are
//! append-only and keep insertion order. Nothing persists across restarts,
//! so these adapters are suitable for tests and local development only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use potluck_domain::{
    Achievement, AchievementCriterion, AchievementId, Condition, ConditionGroup, ConditionGroupId,
    ConditionId, CriterionId, CriterionKind, CriterionProgressId, Event, EventId, EventStatus,
    Participation, ParticipationId, Transaction, UserAchievement, UserAchievementId,
    UserCriterionProgress, UserId,
};

use crate::app::Stores;
use crate::infrastructure::ports::{
    AchievementRepo, ConditionRepo, EventRepo, Notification, NotifyError, ParticipationRepo,
    StoreError, TransactionRepo, UpdateNotifier,
};

// =============================================================================
// Event Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryEventStore {
    events: DashMap<EventId, Event>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event. Creation is a collaborator concern, so this is an
    /// inherent method rather than part of the port.
    pub fn insert(&self, event: Event) {
        self.events.insert(event.id, event);
    }
}

#[async_trait]
impl EventRepo for InMemoryEventStore {
    async fn get(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.events.get(&id).map(|e| e.clone()))
    }

    async fn update_status(
        &self,
        id: EventId,
        status: EventStatus,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut event = self
            .events
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Event", id))?;
        event.status = status;
        event.finished_at = finished_at;
        Ok(())
    }
}

// =============================================================================
// Condition Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryConditionStore {
    groups: DashMap<ConditionGroupId, ConditionGroup>,
    conditions: DashMap<ConditionId, Condition>,
}

impl InMemoryConditionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_group(&self, group: ConditionGroup) {
        self.groups.insert(group.id, group);
    }

    pub fn insert_condition(&self, condition: Condition) {
        self.conditions.insert(condition.id, condition);
    }
}

#[async_trait]
impl ConditionRepo for InMemoryConditionStore {
    async fn get_condition(&self, id: ConditionId) -> Result<Option<Condition>, StoreError> {
        Ok(self.conditions.get(&id).map(|c| c.clone()))
    }

    async fn get_group(&self, id: ConditionGroupId) -> Result<Option<ConditionGroup>, StoreError> {
        Ok(self.groups.get(&id).map(|g| g.clone()))
    }

    async fn list_conditions_in_group(
        &self,
        group_id: ConditionGroupId,
    ) -> Result<Vec<Condition>, StoreError> {
        // Map iteration order is arbitrary; sort for stable results
        let mut conditions: Vec<Condition> = self
            .conditions
            .iter()
            .filter(|c| c.group_id == group_id)
            .map(|c| c.clone())
            .collect();
        conditions.sort_by_key(|c| *c.id.as_uuid());
        Ok(conditions)
    }

    async fn list_groups_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<ConditionGroup>, StoreError> {
        let mut groups: Vec<ConditionGroup> = self
            .groups
            .iter()
            .filter(|g| g.event_id == event_id)
            .map(|g| g.clone())
            .collect();
        groups.sort_by_key(|g| *g.id.as_uuid());
        Ok(groups)
    }

    async fn set_condition_completed(&self, id: ConditionId) -> Result<(), StoreError> {
        let mut condition = self
            .conditions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Condition", id))?;
        condition.complete();
        Ok(())
    }

    async fn set_group_completed(&self, id: ConditionGroupId) -> Result<(), StoreError> {
        let mut group = self
            .groups
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("ConditionGroup", id))?;
        group
            .complete()
            .map_err(|e| StoreError::constraint(e.to_string()))?;
        Ok(())
    }

    async fn set_group_failed(&self, id: ConditionGroupId) -> Result<(), StoreError> {
        let mut group = self
            .groups
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("ConditionGroup", id))?;
        group
            .fail()
            .map_err(|e| StoreError::constraint(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Participation Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryParticipationStore {
    participations: DashMap<ParticipationId, Participation>,
}

impl InMemoryParticipationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, participation: Participation) {
        self.participations
            .insert(participation.id, participation);
    }
}

#[async_trait]
impl ParticipationRepo for InMemoryParticipationStore {
    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<Participation>, StoreError> {
        // Keep insertion order so weighted draws walk a stable pool
        let mut participations: Vec<Participation> = self
            .participations
            .iter()
            .filter(|p| p.event_id == event_id)
            .map(|p| p.clone())
            .collect();
        participations.sort_by_key(|p| (p.created_at, *p.id.as_uuid()));
        Ok(participations)
    }
}

// =============================================================================
// Ledger Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryLedger {
    transactions: RwLock<Vec<Transaction>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in creation order.
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.transactions.read().await.clone()
    }
}

#[async_trait]
impl TransactionRepo for InMemoryLedger {
    async fn create(&self, transaction: &Transaction) -> Result<(), StoreError> {
        self.transactions.write().await.push(transaction.clone());
        Ok(())
    }
}

// =============================================================================
// Achievement Store
// =============================================================================

#[derive(Default)]
pub struct InMemoryAchievementStore {
    achievements: DashMap<AchievementId, Achievement>,
    criteria: DashMap<CriterionId, AchievementCriterion>,
    user_achievements: DashMap<UserAchievementId, UserAchievement>,
    progress: DashMap<CriterionProgressId, UserCriterionProgress>,
}

impl InMemoryAchievementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_achievement(&self, achievement: Achievement) {
        self.achievements.insert(achievement.id, achievement);
    }

    pub fn insert_criterion(&self, criterion: AchievementCriterion) {
        self.criteria.insert(criterion.id, criterion);
    }

    /// Look up a user's standing against one achievement, if any exists yet.
    pub fn find_user_achievement(
        &self,
        user_id: UserId,
        achievement_id: AchievementId,
    ) -> Option<UserAchievement> {
        self.user_achievements
            .iter()
            .find(|ua| ua.user_id == user_id && ua.achievement_id == achievement_id)
            .map(|ua| ua.clone())
    }
}

#[async_trait]
impl AchievementRepo for InMemoryAchievementStore {
    async fn list_criteria_by_kind(
        &self,
        kind: CriterionKind,
    ) -> Result<Vec<AchievementCriterion>, StoreError> {
        let mut criteria: Vec<AchievementCriterion> = self
            .criteria
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.clone())
            .collect();
        criteria.sort_by_key(|c| *c.id.as_uuid());
        Ok(criteria)
    }

    async fn list_criteria_for_achievement(
        &self,
        achievement_id: AchievementId,
    ) -> Result<Vec<AchievementCriterion>, StoreError> {
        let mut criteria: Vec<AchievementCriterion> = self
            .criteria
            .iter()
            .filter(|c| c.achievement_id == achievement_id)
            .map(|c| c.clone())
            .collect();
        criteria.sort_by_key(|c| *c.id.as_uuid());
        Ok(criteria)
    }

    async fn get_or_create_user_achievement(
        &self,
        user_id: UserId,
        achievement_id: AchievementId,
    ) -> Result<UserAchievement, StoreError> {
        if let Some(existing) = self.find_user_achievement(user_id, achievement_id) {
            return Ok(existing);
        }
        let created = UserAchievement::new(user_id, achievement_id);
        self.user_achievements.insert(created.id, created.clone());
        Ok(created)
    }

    async fn save_user_achievement(
        &self,
        user_achievement: &UserAchievement,
    ) -> Result<(), StoreError> {
        self.user_achievements
            .insert(user_achievement.id, user_achievement.clone());
        Ok(())
    }

    async fn get_or_create_progress(
        &self,
        user_achievement_id: UserAchievementId,
        criterion_id: CriterionId,
    ) -> Result<UserCriterionProgress, StoreError> {
        let existing = self
            .progress
            .iter()
            .find(|p| p.user_achievement_id == user_achievement_id && p.criterion_id == criterion_id)
            .map(|p| p.clone());
        if let Some(progress) = existing {
            return Ok(progress);
        }
        let created = UserCriterionProgress::new(user_achievement_id, criterion_id);
        self.progress.insert(created.id, created.clone());
        Ok(created)
    }

    async fn save_progress(&self, progress: &UserCriterionProgress) -> Result<(), StoreError> {
        self.progress.insert(progress.id, progress.clone());
        Ok(())
    }

    async fn list_progress_for_user_achievement(
        &self,
        user_achievement_id: UserAchievementId,
    ) -> Result<Vec<UserCriterionProgress>, StoreError> {
        let mut records: Vec<UserCriterionProgress> = self
            .progress
            .iter()
            .filter(|p| p.user_achievement_id == user_achievement_id)
            .map(|p| p.clone())
            .collect();
        records.sort_by_key(|p| *p.id.as_uuid());
        Ok(records)
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// In-process notifier that records everything published to it.
#[derive(Default)]
pub struct InMemoryNotifier {
    published: RwLock<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications in publish order.
    pub async fn published(&self) -> Vec<Notification> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl UpdateNotifier for InMemoryNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), NotifyError> {
        if let Ok(payload) = serde_json::to_string(&notification) {
            debug!(%payload, "Notification published");
        }
        self.published.write().await.push(notification);
        Ok(())
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// All in-memory stores, wired together for tests and local development.
pub struct InMemoryStores {
    pub events: Arc<InMemoryEventStore>,
    pub conditions: Arc<InMemoryConditionStore>,
    pub participations: Arc<InMemoryParticipationStore>,
    pub ledger: Arc<InMemoryLedger>,
    pub achievements: Arc<InMemoryAchievementStore>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self {
            events: Arc::new(InMemoryEventStore::new()),
            conditions: Arc::new(InMemoryConditionStore::new()),
            participations: Arc::new(InMemoryParticipationStore::new()),
            ledger: Arc::new(InMemoryLedger::new()),
            achievements: Arc::new(InMemoryAchievementStore::new()),
        }
    }

    /// Port-trait view of these stores for [`crate::App::new`].
    pub fn ports(&self) -> Stores {
        Stores {
            events: self.events.clone(),
            conditions: self.conditions.clone(),
            participations: self.participations.clone(),
            ledger: self.ledger.clone(),
            achievements: self.achievements.clone(),
        }
    }
}

impl Default for InMemoryStores {
    fn default() -> Self {
        Self::new()
    }
}
