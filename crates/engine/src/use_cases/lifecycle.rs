//! Event lifecycle - the single owner of event status transitions.
//!
//! An event leaves IN_PROGRESS exactly once: FINISHED when any condition
//! group has completed, FAILED when every group is resolved and none
//! completed. FINISHED takes priority when both would apply in the same
//! pass. Re-invocation after a terminal status is a guaranteed no-op, so
//! several condition updates in one logical change can all kick this
//! controller safely.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use potluck_domain::{EventId, EventStatus};

use crate::infrastructure::ports::{
    ClockPort, ConditionRepo, EventRepo, Notification, StoreError, UpdateNotifier,
};
use crate::use_cases::settlement::Settlement;

/// Resolves event status from the state of its condition groups.
pub struct EventLifecycle {
    event_repo: Arc<dyn EventRepo>,
    condition_repo: Arc<dyn ConditionRepo>,
    notifier: Arc<dyn UpdateNotifier>,
    clock: Arc<dyn ClockPort>,
    settlement: Arc<Settlement>,
}

impl EventLifecycle {
    pub fn new(
        event_repo: Arc<dyn EventRepo>,
        condition_repo: Arc<dyn ConditionRepo>,
        notifier: Arc<dyn UpdateNotifier>,
        clock: Arc<dyn ClockPort>,
        settlement: Arc<Settlement>,
    ) -> Self {
        Self {
            event_repo,
            condition_repo,
            notifier,
            clock,
            settlement,
        }
    }

    /// Re-derive the event's status from its groups and transition if due.
    ///
    /// Store failures are logged and absorbed; nothing was marked terminal,
    /// so the next group resolution retries the transition.
    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn resolve_event(&self, event_id: EventId) {
        if let Err(e) = self.try_resolve(event_id).await {
            error!(
                error = %e,
                event_id = %event_id,
                "Event resolution failed, will retry on the next group update"
            );
        }
    }

    async fn try_resolve(&self, event_id: EventId) -> Result<(), StoreError> {
        let Some(event) = self.event_repo.get(event_id).await? else {
            warn!(event_id = %event_id, "Event not found, nothing to resolve");
            return Ok(());
        };
        if event.status.is_terminal() {
            debug!(event_id = %event_id, status = %event.status, "Event already resolved");
            return Ok(());
        }

        let groups = self.condition_repo.list_groups_for_event(event_id).await?;
        if groups.is_empty() {
            // Nothing to resolve against; the event stays in progress
            return Ok(());
        }

        let any_completed = groups.iter().any(|g| g.is_completed);
        let all_resolved = groups.iter().all(|g| g.is_resolved());
        let new_status = if any_completed {
            EventStatus::Finished
        } else if all_resolved {
            EventStatus::Failed
        } else {
            return Ok(());
        };

        let now = self.clock.now();
        self.event_repo
            .update_status(event_id, new_status, Some(now))
            .await?;
        info!(event_id = %event_id, status = %new_status, "Event resolved");

        let notification = Notification::EventUpdated { event_id };
        if let Err(e) = self.notifier.publish(notification).await {
            warn!(error = %e, event_id = %event_id, "Failed to publish event update notification");
        }

        match new_status {
            EventStatus::Finished => {
                // Settlement failures never reach the caller: the status is
                // already terminal and must not be corrupted by payout issues
                if let Err(e) = self.settlement.settle_event(event_id).await {
                    error!(error = %e, event_id = %event_id, "Settlement failed for finished event");
                }
            }
            EventStatus::Failed => self.on_event_failed(event_id),
            EventStatus::InProgress => unreachable!("resolution never yields IN_PROGRESS"),
        }
        Ok(())
    }

    /// Extension point for failed events. No payout, no achievement credit.
    fn on_event_failed(&self, event_id: EventId) {
        info!(event_id = %event_id, "Event failed: every condition group resolved without completing");
    }
}
