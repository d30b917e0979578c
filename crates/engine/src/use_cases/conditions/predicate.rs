//! Predicate evaluation - pure functions over conditions and live event data.
//!
//! A predicate never errors: malformed targets, missing participation data,
//! and out-of-range values all degrade to the "not satisfied" answer. TIME
//! conditions get two distinct reads deliberately kept apart:
//!
//! - [`holds`] applies the condition's stored operator to the current instant
//!   vs the target instant, like any other predicate.
//! - [`deadline_elapsed`] asks only whether the target instant has passed,
//!   ignoring the operator. The group failure path keys off this, so a TIME
//!   condition with e.g. a LESS operator stops holding once the deadline
//!   passes, yet still arms the failure check.

use chrono::{DateTime, Utc};

use potluck_domain::{Condition, ConditionKind, Participation};

/// Number of participations in the event.
pub fn participation_count(participations: &[Participation]) -> f64 {
    participations.len() as f64
}

/// Sum of deposits over the event's participations.
pub fn bank_amount(participations: &[Participation]) -> f64 {
    participations.iter().map(|p| p.deposit).sum()
}

/// Does the condition's predicate hold right now?
pub fn holds(condition: &Condition, participations: &[Participation], now: DateTime<Utc>) -> bool {
    match condition.kind {
        ConditionKind::Participation => {
            compare_numeric(condition, participation_count(participations))
        }
        ConditionKind::Bank => compare_numeric(condition, bank_amount(participations)),
        ConditionKind::Time => match condition.target_instant() {
            Some(target) => condition.operator.compare(
                now.timestamp_millis() as f64,
                target.timestamp_millis() as f64,
            ),
            None => false,
        },
    }
}

/// Has a TIME condition's target instant passed, regardless of its operator?
/// Non-TIME conditions carry no deadline and always answer false.
pub fn deadline_elapsed(condition: &Condition, now: DateTime<Utc>) -> bool {
    if condition.kind != ConditionKind::Time {
        return false;
    }
    match condition.target_instant() {
        Some(target) => now >= target,
        None => false,
    }
}

fn compare_numeric(condition: &Condition, current: f64) -> bool {
    match condition.target_number() {
        Some(target) => condition.operator.compare(current, target),
        None => false,
    }
}
