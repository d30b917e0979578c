//! Domain entities for events, conditions, settlement, and achievements

pub mod achievement;
pub mod condition;
pub mod event;
pub mod participation;
pub mod transaction;

pub use achievement::{
    Achievement, AchievementCriterion, CriterionKind, ProgressUpdate, UserAchievement,
    UserCriterionProgress,
};
pub use condition::{Condition, ConditionGroup, ConditionKind, ConditionOperator};
pub use event::{Event, EventStatus, EventType};
pub use participation::Participation;
pub use transaction::{Transaction, TransactionKind};
