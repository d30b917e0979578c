//! Participation entity - A user's stake in an event
//!
//! Unique per (user, event); repeat participation accumulates onto the same
//! deposit rather than creating a second row. The evaluation engine reads
//! participations to measure bank sums and participant counts but never
//! creates them itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use potluck_domain::{DomainError, EventId, ParticipationId, UserId};

/// A user's deposit into one event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub id: ParticipationId,
    pub event_id: EventId,
    pub user_id: UserId,
    /// Total amount this user has deposited into the event
    pub deposit: f64,
    pub created_at: DateTime<Utc>,
}

impl Participation {
    pub fn new(
        event_id: EventId,
        user_id: UserId,
        deposit: f64,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if deposit < 0.0 || !deposit.is_finite() {
            return Err(DomainError::validation(format!(
                "deposit must be a non-negative amount, got {}",
                deposit
            )));
        }
        Ok(Self {
            id: ParticipationId::new(),
            event_id,
            user_id,
            deposit,
            created_at: now,
        })
    }

    /// Accumulate a further deposit onto this participation
    pub fn add_deposit(&mut self, amount: f64) -> Result<(), DomainError> {
        if amount < 0.0 || !amount.is_finite() {
            return Err(DomainError::validation(format!(
                "deposit increase must be a non-negative amount, got {}",
                amount
            )));
        }
        self.deposit += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_new_participation() {
        let p = Participation::new(EventId::new(), UserId::new(), 250.0, test_now()).unwrap();
        assert_eq!(p.deposit, 250.0);
    }

    #[test]
    fn test_negative_deposit_rejected() {
        let result = Participation::new(EventId::new(), UserId::new(), -1.0, test_now());
        assert!(result.is_err());
    }

    #[test]
    fn test_deposits_accumulate() {
        let mut p = Participation::new(EventId::new(), UserId::new(), 100.0, test_now()).unwrap();
        p.add_deposit(50.0).unwrap();
        assert_eq!(p.deposit, 150.0);
    }

    #[test]
    fn test_negative_increase_rejected() {
        let mut p = Participation::new(EventId::new(), UserId::new(), 100.0, test_now()).unwrap();
        assert!(p.add_deposit(-5.0).is_err());
        assert_eq!(p.deposit, 100.0);
    }
}
