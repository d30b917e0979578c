//! Use cases - the engine's four collaborating services.
//!
//! Condition tracking feeds the lifecycle controller, which triggers
//! settlement on FINISHED events; settlement fans out to achievement
//! tracking. All four are wired once by [`crate::App`].

pub mod achievements;
pub mod conditions;
pub mod lifecycle;
pub mod settlement;

pub use achievements::{AchievementTracker, CompletedEventOutcome};
pub use conditions::ConditionTracker;
pub use lifecycle::EventLifecycle;
pub use settlement::Settlement;
