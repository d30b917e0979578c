//! Update Notifier port - interface for publishing live update notifications.
//!
//! Abstracts the real-time bus (in-process, WebSocket fan-out, Redis pub/sub)
//! so the engine can announce state changes without knowing the transport.

use async_trait::async_trait;
use serde::Serialize;

use potluck_domain::{EventId, UserId};

use super::error::NotifyError;

/// Everything the engine announces to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// An event's status changed (finished or failed)
    EventUpdated { event_id: EventId },
    /// A condition group of the event completed or failed
    GroupConditionsUpdated { event_id: EventId },
    /// A settlement payout credited this user
    BalanceUpdated { user_id: UserId },
}

/// Port for publishing update notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpdateNotifier: Send + Sync {
    /// Publish a notification to the bus.
    ///
    /// This is a best-effort operation; failures are logged by callers and
    /// never break the evaluation or settlement flow.
    async fn publish(&self, notification: Notification) -> Result<(), NotifyError>;
}
