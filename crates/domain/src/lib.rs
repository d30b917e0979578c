extern crate self as potluck_domain;

pub mod entities;
pub mod error;
pub mod ids;

// Re-export all entities (explicit list in entities/mod.rs)
pub use entities::{
    Achievement, AchievementCriterion, Condition, ConditionGroup, ConditionKind,
    ConditionOperator, CriterionKind, Event, EventStatus, EventType, Participation,
    ProgressUpdate, Transaction, TransactionKind, UserAchievement, UserCriterionProgress,
};

pub use error::DomainError;

// Re-export ID types
pub use ids::{
    AchievementId, ConditionGroupId, ConditionId, CriterionId, CriterionProgressId, EventId,
    ParticipationId, TransactionId, UserAchievementId, UserId,
};
