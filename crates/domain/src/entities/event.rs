//! Event entity - Time-limited, multi-condition fundraising/wagering events
//!
//! An event collects deposits from participants and finishes when any one of
//! its condition groups completes, or fails when every group is resolved and
//! none completed. Status is terminal once it leaves `InProgress`: settlement
//! and achievement tracking key off that single transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use potluck_domain::{DomainError, EventId, UserId};

/// Kind of event, selecting the payout rule applied at settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Funds go to a fixed recipient, 4% commission
    Donation,
    /// Funds go to a fixed recipient, 2% commission
    Fundraising,
    /// Funds go to one deposit-weighted randomly drawn participant, 10% commission
    Jackpot,
}

impl EventType {
    /// Fraction of the bank paid out at settlement
    pub fn payout_fraction(&self) -> f64 {
        match self {
            Self::Donation => 0.96,
            Self::Fundraising => 0.98,
            Self::Jackpot => 0.90,
        }
    }

    /// Fraction of the bank retained as commission
    pub fn commission_fraction(&self) -> f64 {
        1.0 - self.payout_fraction()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Donation => "DONATION",
            Self::Fundraising => "FUNDRAISING",
            Self::Jackpot => "JACKPOT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DONATION" => Ok(Self::Donation),
            "FUNDRAISING" => Ok(Self::Fundraising),
            "JACKPOT" => Ok(Self::Jackpot),
            _ => Err(DomainError::parse(format!("Unknown event type: {}", s))),
        }
    }
}

/// Lifecycle status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Accepting participations, conditions still being evaluated
    InProgress,
    /// At least one condition group completed; settlement has been triggered
    Finished,
    /// Every condition group resolved without any completing
    Failed,
}

impl EventStatus {
    /// Terminal statuses are never left once entered
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(Self::InProgress),
            "FINISHED" => Ok(Self::Finished),
            "FAILED" => Ok(Self::Failed),
            _ => Err(DomainError::parse(format!("Unknown event status: {}", s))),
        }
    }
}

/// A fundraising/wagering event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub status: EventStatus,
    /// Title shown to users; not interpreted by the engine
    pub name: String,
    pub creator_id: UserId,
    /// Fixed payout recipient for donation/fundraising events.
    /// Jackpot events ignore this and draw a winner instead.
    pub recipient_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    /// Stamped when the event reaches a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(
        event_type: EventType,
        name: impl Into<String>,
        creator_id: UserId,
        recipient_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            status: EventStatus::InProgress,
            name: name.into(),
            creator_id,
            recipient_id,
            created_at: now,
            finished_at: None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == EventStatus::InProgress
    }

    /// Transition to FINISHED. Only valid from IN_PROGRESS.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != EventStatus::InProgress {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot finish event in status {}",
                self.status
            )));
        }
        self.status = EventStatus::Finished;
        self.finished_at = Some(now);
        Ok(())
    }

    /// Transition to FAILED. Only valid from IN_PROGRESS.
    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != EventStatus::InProgress {
            return Err(DomainError::invalid_state_transition(format!(
                "cannot fail event in status {}",
                self.status
            )));
        }
        self.status = EventStatus::Failed;
        self.finished_at = Some(now);
        Ok(())
    }
}
