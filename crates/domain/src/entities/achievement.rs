//! Achievement entities - Per-user progress tracking against criterion templates
//!
//! An achievement is a template owning one-or-more criteria. Each user holds a
//! `UserAchievement` per achievement and one `UserCriterionProgress` per
//! criterion of it. Progress records are updated by the achievement engine via
//! one of three policies (increment, max, set), chosen per criterion kind, and
//! completion is terminal: a completed progress record is never re-opened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use potluck_domain::{
    AchievementId, CriterionId, CriterionProgressId, DomainError, UserAchievementId, UserId,
};

/// What a criterion measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriterionKind {
    /// Largest bank among events the user participated in that finished
    CompletedEventBank,
    /// Largest participant count among finished events the user was part of
    CompletedEventPeople,
    /// Number of finished events the user was part of, tracked over time
    CompletedEventTime,
    /// Largest single payout the user received
    SingleEventIncome,
    /// Cumulative payout the user has received
    TotalIncome,
    /// Number of finished events the user was part of
    CompletedEventsCount,
    /// Number of events the user created
    CreatedEventsCount,
    /// Number of events the user created or joined
    AllEventsCount,
    /// Longest run of consecutive active days
    ActivityStreak,
    /// User's current account balance
    UserBankBalance,
}

impl CriterionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompletedEventBank => "COMPLETED_EVENT_BANK",
            Self::CompletedEventPeople => "COMPLETED_EVENT_PEOPLE",
            Self::CompletedEventTime => "COMPLETED_EVENT_TIME",
            Self::SingleEventIncome => "SINGLE_EVENT_INCOME",
            Self::TotalIncome => "TOTAL_INCOME",
            Self::CompletedEventsCount => "COMPLETED_EVENTS_COUNT",
            Self::CreatedEventsCount => "CREATED_EVENTS_COUNT",
            Self::AllEventsCount => "ALL_EVENTS_COUNT",
            Self::ActivityStreak => "ACTIVITY_STREAK",
            Self::UserBankBalance => "USER_BANK_BALANCE",
        }
    }
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CriterionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED_EVENT_BANK" => Ok(Self::CompletedEventBank),
            "COMPLETED_EVENT_PEOPLE" => Ok(Self::CompletedEventPeople),
            "COMPLETED_EVENT_TIME" => Ok(Self::CompletedEventTime),
            "SINGLE_EVENT_INCOME" => Ok(Self::SingleEventIncome),
            "TOTAL_INCOME" => Ok(Self::TotalIncome),
            "COMPLETED_EVENTS_COUNT" => Ok(Self::CompletedEventsCount),
            "CREATED_EVENTS_COUNT" => Ok(Self::CreatedEventsCount),
            "ALL_EVENTS_COUNT" => Ok(Self::AllEventsCount),
            "ACTIVITY_STREAK" => Ok(Self::ActivityStreak),
            "USER_BANK_BALANCE" => Ok(Self::UserBankBalance),
            _ => Err(DomainError::parse(format!(
                "Unknown criterion kind: {}",
                s
            ))),
        }
    }
}

/// How a progress value absorbs a new observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressUpdate {
    /// `currentValue += delta` (counters)
    Increment(i64),
    /// `currentValue = max(currentValue, value)` (records/highscores)
    Max(i64),
    /// `currentValue = value` (absolute quantities, e.g. balance)
    Set(i64),
}

/// An achievement template; criteria live in `AchievementCriterion`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
}

impl Achievement {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: AchievementId::new(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// One measurable requirement of an achievement, independent of any user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementCriterion {
    pub id: CriterionId,
    pub achievement_id: AchievementId,
    pub kind: CriterionKind,
    /// Progress value at which the criterion counts as completed
    pub target: i64,
}

impl AchievementCriterion {
    pub fn new(achievement_id: AchievementId, kind: CriterionKind, target: i64) -> Self {
        Self {
            id: CriterionId::new(),
            achievement_id,
            kind,
            target,
        }
    }
}

/// A user's standing against one achievement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: UserAchievementId,
    pub user_id: UserId,
    pub achievement_id: AchievementId,
    pub is_unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl UserAchievement {
    pub fn new(user_id: UserId, achievement_id: AchievementId) -> Self {
        Self {
            id: UserAchievementId::new(),
            user_id,
            achievement_id,
            is_unlocked: false,
            unlocked_at: None,
        }
    }

    /// Mark the achievement unlocked. Returns false when already unlocked.
    pub fn unlock(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_unlocked {
            return false;
        }
        self.is_unlocked = true;
        self.unlocked_at = Some(now);
        true
    }
}

/// A user's progress against one criterion of one achievement.
/// Unique per (userAchievementId, criterionId).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCriterionProgress {
    pub id: CriterionProgressId,
    pub user_achievement_id: UserAchievementId,
    pub criterion_id: CriterionId,
    pub current_value: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl UserCriterionProgress {
    pub fn new(user_achievement_id: UserAchievementId, criterion_id: CriterionId) -> Self {
        Self {
            id: CriterionProgressId::new(),
            user_achievement_id,
            criterion_id,
            current_value: 0,
            is_completed: false,
            completed_at: None,
        }
    }

    /// Absorb one observation and re-check the target.
    ///
    /// Completed records are terminal: the update is ignored entirely.
    /// Returns true when this call completed the criterion.
    pub fn apply(&mut self, update: ProgressUpdate, target: i64, now: DateTime<Utc>) -> bool {
        if self.is_completed {
            return false;
        }
        self.current_value = match update {
            ProgressUpdate::Increment(delta) => self.current_value.saturating_add(delta),
            ProgressUpdate::Max(value) => self.current_value.max(value),
            ProgressUpdate::Set(value) => value,
        };
        if self.current_value >= target {
            self.is_completed = true;
            self.completed_at = Some(now);
            return true;
        }
        false
    }
}
