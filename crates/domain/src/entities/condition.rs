//! Condition and ConditionGroup entities - Completion predicates for events
//!
//! An event owns zero-or-more condition groups; each group is a conjunction of
//! conditions. The event finishes when any one group completes. A group fails
//! when its TIME deadline has elapsed while a non-TIME condition is still
//! unmet, so an event whose groups all resolve without completing can fail.
//!
//! Targets are stored string-encoded (numeric for BANK/PARTICIPATION, an
//! RFC 3339 instant for TIME). Malformed stored values must never panic the
//! evaluator: the accessors below return `None` and the predicate degrades to
//! "not satisfied".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use potluck_domain::{ConditionGroupId, ConditionId, DomainError, EventId};

/// Measured quantity a condition is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionKind {
    /// Current instant vs a target instant
    Time,
    /// Sum of deposits over the event's participations
    Bank,
    /// Count of the event's participations
    Participation,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "TIME",
            Self::Bank => "BANK",
            Self::Participation => "PARTICIPATION",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConditionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TIME" => Ok(Self::Time),
            "BANK" => Ok(Self::Bank),
            "PARTICIPATION" => Ok(Self::Participation),
            _ => Err(DomainError::parse(format!("Unknown condition kind: {}", s))),
        }
    }
}

/// Comparison applied between the measured value and the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    Equals,
    Greater,
    Less,
    GreaterEquals,
    LessEquals,
}

impl ConditionOperator {
    /// Apply the comparison. NaN targets compare false under every operator,
    /// which is exactly the degraded answer wanted for malformed data.
    pub fn compare(&self, current: f64, target: f64) -> bool {
        match self {
            Self::Equals => current == target,
            Self::Greater => current > target,
            Self::Less => current < target,
            Self::GreaterEquals => current >= target,
            Self::LessEquals => current <= target,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::Greater => "GREATER",
            Self::Less => "LESS",
            Self::GreaterEquals => "GREATER_EQUALS",
            Self::LessEquals => "LESS_EQUALS",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConditionOperator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUALS" => Ok(Self::Equals),
            "GREATER" => Ok(Self::Greater),
            "LESS" => Ok(Self::Less),
            "GREATER_EQUALS" => Ok(Self::GreaterEquals),
            "LESS_EQUALS" => Ok(Self::LessEquals),
            _ => Err(DomainError::parse(format!(
                "Unknown condition operator: {}",
                s
            ))),
        }
    }
}

/// A single predicate inside a condition group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: ConditionId,
    pub group_id: ConditionGroupId,
    pub kind: ConditionKind,
    pub operator: ConditionOperator,
    /// String-encoded target: numeric for BANK/PARTICIPATION, RFC 3339 for TIME
    pub value: String,
    /// Terminal once true; a completed condition is never re-evaluated
    pub is_completed: bool,
}

impl Condition {
    pub fn new(
        group_id: ConditionGroupId,
        kind: ConditionKind,
        operator: ConditionOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: ConditionId::new(),
            group_id,
            kind,
            operator,
            value: value.into(),
            is_completed: false,
        }
    }

    /// Numeric target for BANK/PARTICIPATION conditions.
    /// `None` when the stored value does not parse.
    pub fn target_number(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok()
    }

    /// Target instant for TIME conditions.
    /// `None` when the stored value is not a valid RFC 3339 timestamp.
    pub fn target_instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.value.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Mark the condition satisfied. Terminal.
    pub fn complete(&mut self) {
        self.is_completed = true;
    }
}

/// A conjunction of conditions owned by one event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup {
    pub id: ConditionGroupId,
    pub event_id: EventId,
    pub is_completed: bool,
    pub is_failed: bool,
}

impl ConditionGroup {
    pub fn new(event_id: EventId) -> Self {
        Self {
            id: ConditionGroupId::new(),
            event_id,
            is_completed: false,
            is_failed: false,
        }
    }

    /// A group is resolved once it has completed or failed; both are terminal
    pub fn is_resolved(&self) -> bool {
        self.is_completed || self.is_failed
    }

    /// Mark the group completed. Only valid while unresolved.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        if self.is_resolved() {
            return Err(DomainError::invalid_state_transition(
                "condition group is already resolved",
            ));
        }
        self.is_completed = true;
        Ok(())
    }

    /// Mark the group failed. Only valid while unresolved.
    pub fn fail(&mut self) -> Result<(), DomainError> {
        if self.is_resolved() {
            return Err(DomainError::invalid_state_transition(
                "condition group is already resolved",
            ));
        }
        self.is_failed = true;
        Ok(())
    }
}
