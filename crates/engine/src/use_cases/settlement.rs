//! Event settlement - Pays out the collected bank once an event finishes.
//!
//! Donation and fundraising events pay their fixed recipient; jackpot events
//! draw a winner with a weighted lottery where every participant gets a base
//! ticket allocation plus one ticket per whole unit deposited. The payout is
//! the bank times the event type's payout fraction, floored to a whole amount;
//! the remainder is the platform commission and never leaves the bank.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use potluck_domain::{EventId, EventType, Participation, Transaction, UserId};

use crate::infrastructure::ports::{
    ClockPort, EventRepo, Notification, ParticipationRepo, RandomPort, StoreError,
    TransactionRepo, UpdateNotifier,
};
use crate::use_cases::achievements::{AchievementTracker, CompletedEventOutcome};
use crate::use_cases::conditions::predicate;

/// Share of the bank converted into base lottery tickets for every
/// jackpot participant, flattening the odds between small and large deposits.
pub const RANDOMNESS_COEFFICIENT: f64 = 0.2;

/// Floor for the base ticket allocation when the bank is small.
pub const MINIMUM_BASE_TICKETS: u64 = 5;

/// Issues the payout for a finished event.
pub struct Settlement {
    event_repo: Arc<dyn EventRepo>,
    participation_repo: Arc<dyn ParticipationRepo>,
    transaction_repo: Arc<dyn TransactionRepo>,
    achievements: Arc<AchievementTracker>,
    notifier: Arc<dyn UpdateNotifier>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
}

impl Settlement {
    pub fn new(
        event_repo: Arc<dyn EventRepo>,
        participation_repo: Arc<dyn ParticipationRepo>,
        transaction_repo: Arc<dyn TransactionRepo>,
        achievements: Arc<AchievementTracker>,
        notifier: Arc<dyn UpdateNotifier>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            event_repo,
            participation_repo,
            transaction_repo,
            achievements,
            notifier,
            clock,
            random,
        }
    }

    /// Pay out the event's bank and record the income transaction.
    ///
    /// The lifecycle invokes this exactly once, right after the event's
    /// transition to FINISHED. Events with an empty bank, a missing recipient
    /// or no participants to draw from settle as a logged no-op so the
    /// finished status is never blocked on payout preconditions.
    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn settle_event(&self, event_id: EventId) -> Result<(), StoreError> {
        let event = self
            .event_repo
            .get(event_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Event", event_id))?;

        let participations = self.participation_repo.list_for_event(event_id).await?;
        let bank = predicate::bank_amount(&participations);
        if bank <= 0.0 {
            info!(event_id = %event_id, "Event finished with an empty bank, nothing to settle");
            return Ok(());
        }

        let payout = (bank * event.event_type.payout_fraction()).floor() as i64;
        let recipient = match event.event_type {
            EventType::Donation | EventType::Fundraising => match event.recipient_id {
                Some(user_id) => user_id,
                None => {
                    warn!(
                        event_id = %event_id,
                        event_type = %event.event_type,
                        "Event has no recipient, skipping settlement"
                    );
                    return Ok(());
                }
            },
            EventType::Jackpot => match self.draw_winner(&participations, bank) {
                Some(user_id) => user_id,
                None => {
                    warn!(event_id = %event_id, "Jackpot has no participants to draw from");
                    return Ok(());
                }
            },
        };

        let now = self.clock.now();
        let outcome = CompletedEventOutcome {
            event_id,
            creator_id: event.creator_id,
            recipient_id: recipient,
            payout,
            bank_amount: bank,
            participants_count: participations.len() as i64,
            completed_at: now,
        };
        let participant_ids: Vec<UserId> = participations.iter().map(|p| p.user_id).collect();
        self.achievements
            .track_event_completed(&outcome, &participant_ids)
            .await;

        let transaction = Transaction::event_income(recipient, event_id, payout, now);
        self.transaction_repo.create(&transaction).await?;
        info!(
            event_id = %event_id,
            user_id = %recipient,
            amount = payout,
            "Settlement payout issued"
        );

        self.notify(Notification::BalanceUpdated { user_id: recipient })
            .await;
        Ok(())
    }

    /// Draw the jackpot winner with a deposit-weighted lottery.
    ///
    /// Every participant holds `base + floor(deposit)` tickets (at least one
    /// deposit ticket), where `base` grows with the bank so a whale's odds
    /// stay bounded.
    fn draw_winner(&self, participations: &[Participation], bank: f64) -> Option<UserId> {
        if participations.is_empty() {
            return None;
        }
        let base_tickets =
            ((bank * RANDOMNESS_COEFFICIENT).floor() as u64).max(MINIMUM_BASE_TICKETS);
        let ticket_counts: Vec<(UserId, u64)> = participations
            .iter()
            .map(|p| {
                let deposit_tickets = (p.deposit.floor() as u64).max(1);
                (p.user_id, base_tickets + deposit_tickets)
            })
            .collect();
        let total: u64 = ticket_counts.iter().map(|(_, tickets)| tickets).sum();
        let winning_ticket = self.random.gen_range(0, total - 1);

        let mut cumulative = 0u64;
        for (user_id, tickets) in &ticket_counts {
            cumulative += tickets;
            if winning_ticket < cumulative {
                return Some(*user_id);
            }
        }
        // Unreachable while the draw stays within the ticket range
        ticket_counts.last().map(|(user_id, _)| *user_id)
    }

    async fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.publish(notification).await {
            warn!(error = %e, "Failed to publish settlement notification");
        }
    }
}
