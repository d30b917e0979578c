//! Transaction entity - Immutable ledger entries for balance changes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use potluck_domain::{EventId, TransactionId, UserId};

/// What a ledger entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// User moved money into an event
    Deposit,
    /// User withdrew money from their balance
    Withdrawal,
    /// Settlement payout credited to an event's recipient or winner
    EventIncome,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::EventIncome => "EVENT_INCOME",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable balance change. Created exactly once per settlement payout;
/// never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    /// Set when the entry was produced by an event's settlement
    pub event_id: Option<EventId>,
    pub kind: TransactionKind,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        event_id: Option<EventId>,
        kind: TransactionKind,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            event_id,
            kind,
            amount,
            created_at: now,
        }
    }

    /// Settlement payout entry
    pub fn event_income(
        user_id: UserId,
        event_id: EventId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            Some(event_id),
            TransactionKind::EventIncome,
            amount,
            now,
        )
    }
}
