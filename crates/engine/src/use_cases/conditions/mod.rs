//! Condition tracking - the group resolver state machine.
//!
//! A condition group is a conjunction: it completes when every member
//! condition has completed, and fails when its TIME deadline has elapsed
//! while a non-TIME condition is still unmet. Either resolution is terminal
//! and kicks the event lifecycle.
//!
//! The public entry points absorb store errors: a failed lookup is logged
//! and the check is skipped for this pass. Nothing is marked complete on a
//! failed read, so the next trigger (participation change, periodic time
//! tick) retries the same check from scratch.

pub mod predicate;

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use potluck_domain::{ConditionGroupId, ConditionId, ConditionKind, EventId, Participation};

use crate::infrastructure::ports::{
    ClockPort, ConditionRepo, Notification, ParticipationRepo, StoreError, UpdateNotifier,
};
use crate::use_cases::lifecycle::EventLifecycle;

/// Evaluates conditions and resolves their groups.
pub struct ConditionTracker {
    condition_repo: Arc<dyn ConditionRepo>,
    participation_repo: Arc<dyn ParticipationRepo>,
    notifier: Arc<dyn UpdateNotifier>,
    clock: Arc<dyn ClockPort>,
    lifecycle: Arc<EventLifecycle>,
}

impl ConditionTracker {
    pub fn new(
        condition_repo: Arc<dyn ConditionRepo>,
        participation_repo: Arc<dyn ParticipationRepo>,
        notifier: Arc<dyn UpdateNotifier>,
        clock: Arc<dyn ClockPort>,
        lifecycle: Arc<EventLifecycle>,
    ) -> Self {
        Self {
            condition_repo,
            participation_repo,
            notifier,
            clock,
            lifecycle,
        }
    }

    /// Sweep every unresolved group of the event, condition by condition.
    ///
    /// This is the entry point for the participation-changed and periodic
    /// time-tick triggers. Groups run sequentially, so no two checks mutate
    /// the same event's condition state concurrently.
    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn check_event_conditions(&self, event_id: EventId) {
        let groups = match self.condition_repo.list_groups_for_event(event_id).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(error = %e, event_id = %event_id, "Failed to list condition groups, skipping this pass");
                return;
            }
        };
        for group in groups {
            if group.is_resolved() {
                continue;
            }
            let conditions = match self.condition_repo.list_conditions_in_group(group.id).await {
                Ok(conditions) => conditions,
                Err(e) => {
                    warn!(error = %e, group_id = %group.id, "Failed to list group conditions, skipping group");
                    continue;
                }
            };
            for condition in conditions {
                if condition.is_completed {
                    continue;
                }
                self.check_condition(condition.id, event_id).await;
            }
        }
    }

    /// Evaluate one condition and resolve its group if warranted.
    ///
    /// Already-completed conditions short-circuit; store failures are logged
    /// and leave no partial state behind.
    #[instrument(skip(self), fields(condition_id = %condition_id, event_id = %event_id))]
    pub async fn check_condition(&self, condition_id: ConditionId, event_id: EventId) {
        if let Err(e) = self.try_check_condition(condition_id, event_id).await {
            warn!(
                error = %e,
                condition_id = %condition_id,
                event_id = %event_id,
                "Condition check failed, will retry on the next trigger"
            );
        }
    }

    async fn try_check_condition(
        &self,
        condition_id: ConditionId,
        event_id: EventId,
    ) -> Result<(), StoreError> {
        let Some(condition) = self.condition_repo.get_condition(condition_id).await? else {
            debug!(condition_id = %condition_id, "Condition not found, nothing to check");
            return Ok(());
        };
        if condition.is_completed {
            return Ok(());
        }

        let participations = self.load_participations(event_id).await;
        let now = self.clock.now();

        if predicate::holds(&condition, &participations, now) {
            self.condition_repo
                .set_condition_completed(condition_id)
                .await?;
            debug!(
                condition_id = %condition_id,
                kind = %condition.kind,
                "Condition completed"
            );
            self.check_group(condition.group_id, event_id).await?;
        } else if condition.kind == ConditionKind::Time && predicate::deadline_elapsed(&condition, now)
        {
            // The operator no longer holds but the instant has passed: the
            // group can only fail now if a non-TIME condition is still unmet.
            self.check_group_deadline(condition.group_id, event_id)
                .await?;
        }
        Ok(())
    }

    /// Degraded read per the evaluation contract: a failed participation
    /// fetch behaves as "no participations" (count 0, bank 0).
    async fn load_participations(&self, event_id: EventId) -> Vec<Participation> {
        match self.participation_repo.list_for_event(event_id).await {
            Ok(participations) => participations,
            Err(e) => {
                warn!(error = %e, event_id = %event_id, "Failed to load participations, evaluating against an empty list");
                Vec::new()
            }
        }
    }

    /// Complete the group once every member condition has completed.
    async fn check_group(
        &self,
        group_id: ConditionGroupId,
        event_id: EventId,
    ) -> Result<(), StoreError> {
        let Some(group) = self.condition_repo.get_group(group_id).await? else {
            debug!(group_id = %group_id, "Condition group not found, nothing to check");
            return Ok(());
        };
        if group.is_resolved() {
            return Ok(());
        }
        let conditions = self.condition_repo.list_conditions_in_group(group_id).await?;
        if conditions.is_empty() {
            // A group with zero conditions can never complete
            return Ok(());
        }
        if !conditions.iter().all(|c| c.is_completed) {
            return Ok(());
        }

        self.condition_repo.set_group_completed(group_id).await?;
        info!(group_id = %group_id, event_id = %event_id, "Condition group completed");
        self.notify_group_updated(event_id).await;
        self.lifecycle.resolve_event(event_id).await;
        Ok(())
    }

    /// Fail the group if its deadline has passed with a non-TIME condition
    /// still unmet. A group whose only incomplete conditions are TIME never
    /// fails here; it completes once its TIME predicate holds.
    async fn check_group_deadline(
        &self,
        group_id: ConditionGroupId,
        event_id: EventId,
    ) -> Result<(), StoreError> {
        let Some(group) = self.condition_repo.get_group(group_id).await? else {
            debug!(group_id = %group_id, "Condition group not found, nothing to check");
            return Ok(());
        };
        if group.is_resolved() {
            return Ok(());
        }
        let conditions = self.condition_repo.list_conditions_in_group(group_id).await?;
        let unmet_non_time = conditions
            .iter()
            .any(|c| c.kind != ConditionKind::Time && !c.is_completed);
        if !unmet_non_time {
            return Ok(());
        }

        self.condition_repo.set_group_failed(group_id).await?;
        info!(
            group_id = %group_id,
            event_id = %event_id,
            "Condition group failed: deadline elapsed with unmet conditions"
        );
        self.notify_group_updated(event_id).await;
        self.lifecycle.resolve_event(event_id).await;
        Ok(())
    }

    async fn notify_group_updated(&self, event_id: EventId) {
        let notification = Notification::GroupConditionsUpdated { event_id };
        if let Err(e) = self.notifier.publish(notification).await {
            warn!(error = %e, event_id = %event_id, "Failed to publish group update notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::infrastructure::ports::{
        MockAchievementRepo, MockConditionRepo, MockEventRepo, MockParticipationRepo,
        MockTransactionRepo, MockUpdateNotifier,
    };
    use crate::use_cases::achievements::AchievementTracker;
    use crate::use_cases::settlement::Settlement;
    use chrono::{DateTime, TimeZone, Utc};
    use mockall::predicate::*;
    use potluck_domain::{
        Condition, ConditionGroup, ConditionOperator, Participation, UserId,
    };

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn participation(event_id: EventId, deposit: f64) -> Participation {
        Participation::new(event_id, UserId::new(), deposit, test_now()).unwrap()
    }

    /// Lifecycle over mocks that expect to never be called.
    fn inert_lifecycle() -> Arc<EventLifecycle> {
        lifecycle_with_events(MockEventRepo::new())
    }

    fn lifecycle_with_events(event_repo: MockEventRepo) -> Arc<EventLifecycle> {
        let mut achievement_repo = MockAchievementRepo::new();
        achievement_repo
            .expect_list_criteria_by_kind()
            .returning(|_| Ok(vec![]));
        let clock = Arc::new(FixedClock(test_now()));
        let event_repo = Arc::new(event_repo);
        let tracker = Arc::new(AchievementTracker::new(
            Arc::new(achievement_repo),
            clock.clone(),
        ));
        let settlement = Arc::new(Settlement::new(
            event_repo.clone(),
            Arc::new(MockParticipationRepo::new()),
            Arc::new(MockTransactionRepo::new()),
            tracker,
            Arc::new(MockUpdateNotifier::new()),
            clock.clone(),
            Arc::new(FixedRandom(0)),
        ));
        Arc::new(EventLifecycle::new(
            event_repo,
            Arc::new(MockConditionRepo::new()),
            Arc::new(MockUpdateNotifier::new()),
            clock,
            settlement,
        ))
    }

    struct Fixture {
        condition_repo: MockConditionRepo,
        participation_repo: MockParticipationRepo,
        notifier: MockUpdateNotifier,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                condition_repo: MockConditionRepo::new(),
                participation_repo: MockParticipationRepo::new(),
                notifier: MockUpdateNotifier::new(),
            }
        }

        fn build(self) -> ConditionTracker {
            self.build_with_lifecycle(inert_lifecycle())
        }

        fn build_with_lifecycle(self, lifecycle: Arc<EventLifecycle>) -> ConditionTracker {
            ConditionTracker::new(
                Arc::new(self.condition_repo),
                Arc::new(self.participation_repo),
                Arc::new(self.notifier),
                Arc::new(FixedClock(test_now())),
                lifecycle,
            )
        }
    }

    #[tokio::test]
    async fn completed_condition_is_never_reevaluated() {
        let mut fx = Fixture::new();
        let mut condition = Condition::new(
            ConditionGroupId::new(),
            ConditionKind::Bank,
            ConditionOperator::GreaterEquals,
            "100",
        );
        condition.complete();
        let condition_id = condition.id;

        fx.condition_repo
            .expect_get_condition()
            .with(eq(condition_id))
            .returning(move |_| Ok(Some(condition.clone())));
        fx.participation_repo.expect_list_for_event().times(0);
        fx.condition_repo.expect_set_condition_completed().times(0);

        fx.build().check_condition(condition_id, EventId::new()).await;
    }

    #[tokio::test]
    async fn satisfied_bank_condition_completes_group() {
        let mut fx = Fixture::new();
        let event_id = EventId::new();
        let group = ConditionGroup::new(event_id);
        let group_id = group.id;
        let condition = Condition::new(
            group_id,
            ConditionKind::Bank,
            ConditionOperator::GreaterEquals,
            "300",
        );
        let condition_id = condition.id;
        let mut completed = condition.clone();
        completed.complete();

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(condition.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(move |event_id| {
                Ok(vec![
                    participation(event_id, 100.0),
                    participation(event_id, 200.0),
                ])
            });
        fx.condition_repo
            .expect_set_condition_completed()
            .with(eq(condition_id))
            .times(1)
            .returning(|_| Ok(()));
        fx.condition_repo
            .expect_get_group()
            .with(eq(group_id))
            .returning(move |_| Ok(Some(group.clone())));
        fx.condition_repo
            .expect_list_conditions_in_group()
            .returning(move |_| Ok(vec![completed.clone()]));
        fx.condition_repo
            .expect_set_group_completed()
            .with(eq(group_id))
            .times(1)
            .returning(|_| Ok(()));
        fx.notifier
            .expect_publish()
            .with(eq(Notification::GroupConditionsUpdated { event_id }))
            .times(1)
            .returning(|_| Ok(()));

        // The lifecycle is invoked but finds the event missing, which is fine
        let mut event_repo = MockEventRepo::new();
        event_repo.expect_get().returning(|_| Ok(None));
        fx.build_with_lifecycle(lifecycle_with_events(event_repo))
            .check_condition(condition_id, event_id)
            .await;
    }

    #[tokio::test]
    async fn partially_met_group_stays_pending() {
        let mut fx = Fixture::new();
        let event_id = EventId::new();
        let group = ConditionGroup::new(event_id);
        let group_id = group.id;
        let bank = Condition::new(
            group_id,
            ConditionKind::Bank,
            ConditionOperator::GreaterEquals,
            "100",
        );
        let bank_id = bank.id;
        let mut bank_completed = bank.clone();
        bank_completed.complete();
        let people = Condition::new(
            group_id,
            ConditionKind::Participation,
            ConditionOperator::GreaterEquals,
            "10",
        );

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(bank.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(move |event_id| Ok(vec![participation(event_id, 150.0)]));
        fx.condition_repo
            .expect_set_condition_completed()
            .times(1)
            .returning(|_| Ok(()));
        fx.condition_repo
            .expect_get_group()
            .returning(move |_| Ok(Some(group.clone())));
        fx.condition_repo
            .expect_list_conditions_in_group()
            .returning(move |_| Ok(vec![bank_completed.clone(), people.clone()]));
        // One condition still pending: no group resolution, no notification
        fx.condition_repo.expect_set_group_completed().times(0);
        fx.condition_repo.expect_set_group_failed().times(0);
        fx.notifier.expect_publish().times(0);

        fx.build().check_condition(bank_id, event_id).await;
    }

    #[tokio::test]
    async fn unsatisfied_condition_is_left_alone() {
        let mut fx = Fixture::new();
        let condition = Condition::new(
            ConditionGroupId::new(),
            ConditionKind::Participation,
            ConditionOperator::GreaterEquals,
            "10",
        );
        let condition_id = condition.id;

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(condition.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(move |event_id| Ok(vec![participation(event_id, 50.0)]));
        fx.condition_repo.expect_set_condition_completed().times(0);
        fx.condition_repo.expect_get_group().times(0);

        fx.build().check_condition(condition_id, EventId::new()).await;
    }

    #[tokio::test]
    async fn elapsed_time_equals_fails_group_with_unmet_conditions() {
        // TIME(EQUALS, past instant) no longer holds, but the deadline has
        // elapsed; the unmet PARTICIPATION condition forces the group to fail.
        let mut fx = Fixture::new();
        let event_id = EventId::new();
        let group = ConditionGroup::new(event_id);
        let group_id = group.id;
        let time = Condition::new(
            group_id,
            ConditionKind::Time,
            ConditionOperator::Equals,
            "2024-06-01T11:00:00Z",
        );
        let time_id = time.id;
        let time_for_list = time.clone();
        let people = Condition::new(
            group_id,
            ConditionKind::Participation,
            ConditionOperator::GreaterEquals,
            "10",
        );

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(time.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(move |event_id| {
                Ok(vec![
                    participation(event_id, 10.0),
                    participation(event_id, 10.0),
                ])
            });
        fx.condition_repo
            .expect_get_group()
            .returning(move |_| Ok(Some(group.clone())));
        fx.condition_repo
            .expect_list_conditions_in_group()
            .returning(move |_| Ok(vec![time_for_list.clone(), people.clone()]));
        fx.condition_repo.expect_set_condition_completed().times(0);
        fx.condition_repo
            .expect_set_group_failed()
            .with(eq(group_id))
            .times(1)
            .returning(|_| Ok(()));
        fx.notifier
            .expect_publish()
            .with(eq(Notification::GroupConditionsUpdated { event_id }))
            .times(1)
            .returning(|_| Ok(()));

        let mut event_repo = MockEventRepo::new();
        event_repo.expect_get().returning(|_| Ok(None));
        fx.build_with_lifecycle(lifecycle_with_events(event_repo))
            .check_condition(time_id, event_id)
            .await;
    }

    #[tokio::test]
    async fn time_only_group_never_fails_on_deadline() {
        // A TIME condition with a deadline operator completes instead of
        // arming the failure path; nothing non-TIME is unmet.
        let mut fx = Fixture::new();
        let event_id = EventId::new();
        let group = ConditionGroup::new(event_id);
        let group_id = group.id;
        let time = Condition::new(
            group_id,
            ConditionKind::Time,
            ConditionOperator::GreaterEquals,
            "2024-06-01T11:00:00Z",
        );
        let time_id = time.id;
        let mut time_completed = time.clone();
        time_completed.complete();

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(time.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(|_| Ok(vec![]));
        fx.condition_repo
            .expect_set_condition_completed()
            .with(eq(time_id))
            .times(1)
            .returning(|_| Ok(()));
        fx.condition_repo
            .expect_get_group()
            .returning(move |_| Ok(Some(group.clone())));
        fx.condition_repo
            .expect_list_conditions_in_group()
            .returning(move |_| Ok(vec![time_completed.clone()]));
        fx.condition_repo.expect_set_group_failed().times(0);
        fx.condition_repo
            .expect_set_group_completed()
            .times(1)
            .returning(|_| Ok(()));
        fx.notifier.expect_publish().times(1).returning(|_| Ok(()));

        let mut event_repo = MockEventRepo::new();
        event_repo.expect_get().returning(|_| Ok(None));
        fx.build_with_lifecycle(lifecycle_with_events(event_repo))
            .check_condition(time_id, event_id)
            .await;
    }

    #[tokio::test]
    async fn resolved_group_short_circuits() {
        let mut fx = Fixture::new();
        let event_id = EventId::new();
        let mut group = ConditionGroup::new(event_id);
        group.complete().unwrap();
        let group_id = group.id;
        let condition = Condition::new(
            group_id,
            ConditionKind::Bank,
            ConditionOperator::GreaterEquals,
            "1",
        );
        let condition_id = condition.id;

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(condition.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(move |event_id| Ok(vec![participation(event_id, 10.0)]));
        fx.condition_repo
            .expect_set_condition_completed()
            .times(1)
            .returning(|_| Ok(()));
        fx.condition_repo
            .expect_get_group()
            .returning(move |_| Ok(Some(group.clone())));
        // Already resolved: conditions are not even listed
        fx.condition_repo.expect_list_conditions_in_group().times(0);
        fx.condition_repo.expect_set_group_completed().times(0);
        fx.notifier.expect_publish().times(0);

        fx.build().check_condition(condition_id, event_id).await;
    }

    #[tokio::test]
    async fn zero_condition_group_never_completes() {
        let mut fx = Fixture::new();
        let event_id = EventId::new();
        let group = ConditionGroup::new(event_id);
        let group_id = group.id;
        // A stray condition pointing at a group that lists no members
        let condition = Condition::new(
            group_id,
            ConditionKind::Bank,
            ConditionOperator::GreaterEquals,
            "1",
        );
        let condition_id = condition.id;

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(condition.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(move |event_id| Ok(vec![participation(event_id, 10.0)]));
        fx.condition_repo
            .expect_set_condition_completed()
            .times(1)
            .returning(|_| Ok(()));
        fx.condition_repo
            .expect_get_group()
            .returning(move |_| Ok(Some(group.clone())));
        fx.condition_repo
            .expect_list_conditions_in_group()
            .returning(|_| Ok(vec![]));
        fx.condition_repo.expect_set_group_completed().times(0);
        fx.notifier.expect_publish().times(0);

        fx.build().check_condition(condition_id, event_id).await;
    }

    #[tokio::test]
    async fn store_failure_is_absorbed_without_mutation() {
        let mut fx = Fixture::new();
        fx.condition_repo
            .expect_get_condition()
            .returning(|_| Err(StoreError::backend("get_condition", "store down")));
        fx.condition_repo.expect_set_condition_completed().times(0);

        // Must not panic or propagate
        fx.build()
            .check_condition(ConditionId::new(), EventId::new())
            .await;
    }

    #[tokio::test]
    async fn failed_participation_read_degrades_to_empty() {
        let mut fx = Fixture::new();
        let condition = Condition::new(
            ConditionGroupId::new(),
            ConditionKind::Bank,
            ConditionOperator::GreaterEquals,
            "1",
        );
        let condition_id = condition.id;

        fx.condition_repo
            .expect_get_condition()
            .returning(move |_| Ok(Some(condition.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(|_| Err(StoreError::backend("list_for_event", "store down")));
        // Bank degrades to 0, so GREATER_EQUALS 1 does not hold
        fx.condition_repo.expect_set_condition_completed().times(0);

        fx.build().check_condition(condition_id, EventId::new()).await;
    }

    #[tokio::test]
    async fn sweep_skips_resolved_groups_and_completed_conditions() {
        let mut fx = Fixture::new();
        let event_id = EventId::new();
        let mut resolved = ConditionGroup::new(event_id);
        resolved.fail().unwrap();
        let pending = ConditionGroup::new(event_id);
        let pending_id = pending.id;
        let mut done = Condition::new(
            pending_id,
            ConditionKind::Bank,
            ConditionOperator::GreaterEquals,
            "100",
        );
        done.complete();
        let open = Condition::new(
            pending_id,
            ConditionKind::Participation,
            ConditionOperator::GreaterEquals,
            "10",
        );
        let open_id = open.id;
        let open_for_get = open.clone();

        fx.condition_repo
            .expect_list_groups_for_event()
            .with(eq(event_id))
            .returning(move |_| Ok(vec![resolved.clone(), pending.clone()]));
        fx.condition_repo
            .expect_list_conditions_in_group()
            .with(eq(pending_id))
            .returning(move |_| Ok(vec![done.clone(), open.clone()]));
        // Only the open condition gets an individual check
        fx.condition_repo
            .expect_get_condition()
            .with(eq(open_id))
            .times(1)
            .returning(move |_| Ok(Some(open_for_get.clone())));
        fx.participation_repo
            .expect_list_for_event()
            .returning(|_| Ok(vec![]));

        fx.build().check_event_conditions(event_id).await;
    }
}
