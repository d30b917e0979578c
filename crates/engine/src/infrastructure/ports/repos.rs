// Port traits define the full contract - some methods are for future use
#![allow(dead_code)]

//! Store port traits for persistence access.
//!
//! The engine only ever needs the narrow operations below; event and
//! participation creation belong to external collaborators and have no port
//! here. Adapters decide how reads and writes map onto their backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use potluck_domain::*;

use super::error::StoreError;

// =============================================================================
// Event Store
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn get(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Persist a lifecycle transition. The status column is mutated only by
    /// the lifecycle controller; everything else on the event is read-only
    /// to this engine.
    async fn update_status(
        &self,
        id: EventId,
        status: EventStatus,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;
}

// =============================================================================
// Condition Store
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConditionRepo: Send + Sync {
    async fn get_condition(&self, id: ConditionId) -> Result<Option<Condition>, StoreError>;
    async fn get_group(&self, id: ConditionGroupId) -> Result<Option<ConditionGroup>, StoreError>;

    async fn list_conditions_in_group(
        &self,
        group_id: ConditionGroupId,
    ) -> Result<Vec<Condition>, StoreError>;
    async fn list_groups_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<ConditionGroup>, StoreError>;

    // Completion/failure flags are terminal once set
    async fn set_condition_completed(&self, id: ConditionId) -> Result<(), StoreError>;
    async fn set_group_completed(&self, id: ConditionGroupId) -> Result<(), StoreError>;
    async fn set_group_failed(&self, id: ConditionGroupId) -> Result<(), StoreError>;
}

// =============================================================================
// Participation Store
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipationRepo: Send + Sync {
    /// All participations of one event. Read-only to this engine.
    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<Participation>, StoreError>;
}

// =============================================================================
// Ledger Store
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepo: Send + Sync {
    /// Append one immutable ledger entry.
    async fn create(&self, transaction: &Transaction) -> Result<(), StoreError>;
}

// =============================================================================
// Achievement Store
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementRepo: Send + Sync {
    /// Criterion templates measuring the given kind, across all achievements.
    async fn list_criteria_by_kind(
        &self,
        kind: CriterionKind,
    ) -> Result<Vec<AchievementCriterion>, StoreError>;

    async fn list_criteria_for_achievement(
        &self,
        achievement_id: AchievementId,
    ) -> Result<Vec<AchievementCriterion>, StoreError>;

    async fn get_or_create_user_achievement(
        &self,
        user_id: UserId,
        achievement_id: AchievementId,
    ) -> Result<UserAchievement, StoreError>;

    async fn save_user_achievement(
        &self,
        user_achievement: &UserAchievement,
    ) -> Result<(), StoreError>;

    async fn get_or_create_progress(
        &self,
        user_achievement_id: UserAchievementId,
        criterion_id: CriterionId,
    ) -> Result<UserCriterionProgress, StoreError>;

    async fn save_progress(&self, progress: &UserCriterionProgress) -> Result<(), StoreError>;

    async fn list_progress_for_user_achievement(
        &self,
        user_achievement_id: UserAchievementId,
    ) -> Result<Vec<UserCriterionProgress>, StoreError>;
}
