//! Shared harness for the e2e flow tests.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};

use potluck_domain::{
    Condition, ConditionGroup, ConditionGroupId, ConditionKind, ConditionOperator, Event,
    EventId, EventStatus, EventType, Participation, UserId,
};

use crate::app::App;
use crate::infrastructure::clock::{FixedClock, FixedRandom};
use crate::infrastructure::memory::{InMemoryNotifier, InMemoryStores};

pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// The whole engine wired over in-memory stores with a pinned clock and
/// a pinned jackpot draw.
pub struct Harness {
    pub stores: InMemoryStores,
    pub notifier: Arc<InMemoryNotifier>,
    pub app: App,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_draw(0)
    }

    /// Pin the jackpot draw to a specific winning ticket.
    pub fn with_draw(winning_ticket: u64) -> Self {
        let stores = InMemoryStores::new();
        let notifier = Arc::new(InMemoryNotifier::new());
        let app = App::new(
            stores.ports(),
            notifier.clone(),
            Arc::new(FixedClock(test_now())),
            Arc::new(FixedRandom(winning_ticket)),
        );
        Self {
            stores,
            notifier,
            app,
        }
    }

    pub fn seed_event(&self, event_type: EventType, recipient_id: Option<UserId>) -> Event {
        let event = Event::new(event_type, "e2e event", UserId::new(), recipient_id, test_now());
        self.stores.events.insert(event.clone());
        event
    }

    pub fn seed_group(&self, event_id: EventId) -> ConditionGroup {
        let group = ConditionGroup::new(event_id);
        self.stores.conditions.insert_group(group.clone());
        group
    }

    pub fn seed_condition(
        &self,
        group_id: ConditionGroupId,
        kind: ConditionKind,
        operator: ConditionOperator,
        value: &str,
    ) -> Condition {
        let condition = Condition::new(group_id, kind, operator, value);
        self.stores.conditions.insert_condition(condition.clone());
        condition
    }

    pub fn seed_participation(
        &self,
        event_id: EventId,
        user_id: UserId,
        deposit: f64,
    ) -> Result<Participation> {
        let participation = Participation::new(event_id, user_id, deposit, test_now())?;
        self.stores.participations.insert(participation.clone());
        Ok(participation)
    }

    pub async fn event_status(&self, event_id: EventId) -> Result<EventStatus> {
        use crate::infrastructure::ports::EventRepo;
        let event = self
            .stores
            .events
            .get(event_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("event not seeded"))?;
        Ok(event.status)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
