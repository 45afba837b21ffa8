use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{PendingTimerEntity, RoundStatusEntity};

/// Countdown pending on an open round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingTimer {
    /// Identifies this arming; closes carrying another token are ignored.
    pub token: Uuid,
    /// Absolute deadline, seconds since the Unix epoch.
    pub expires_at_epoch_seconds: u64,
}

impl PendingTimer {
    /// Fresh timer expiring at `expires_at_epoch_seconds`.
    pub fn new(expires_at_epoch_seconds: u64) -> Self {
        Self {
            token: Uuid::new_v4(),
            expires_at_epoch_seconds,
        }
    }
}

/// Open/closed status of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundStatus {
    /// Initial state. Submissions are refused.
    Closed,
    /// Submissions are accepted, optionally until a deadline.
    Open { timer: Option<PendingTimer> },
}

impl RoundStatus {
    /// Whether submissions are accepted.
    pub fn is_open(&self) -> bool {
        matches!(self, RoundStatus::Open { .. })
    }

    /// Timer pending on the round, if any.
    pub fn timer(&self) -> Option<PendingTimer> {
        match self {
            RoundStatus::Open { timer } => *timer,
            RoundStatus::Closed => None,
        }
    }
}

/// Who closed a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCause {
    Manual,
    Timer,
}

impl CloseCause {
    /// Wire tag of the cause.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseCause::Manual => "manual",
            CloseCause::Timer => "timer",
        }
    }
}

/// Triggers the round state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Organizer opens the round, optionally arming a countdown at once.
    Open { timer: Option<PendingTimer> },
    /// Organizer closes the round.
    CloseManual,
    /// A countdown expired. Only the countdown identified by `token` may close.
    TimerExpired { token: Uuid },
    /// Arm (or re-arm) the countdown of an open round.
    StartTimer(PendingTimer),
    /// Cancel the countdown of an open round.
    StopTimer,
}

/// Side effects following an applied transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEffect {
    /// The open flag flipped.
    StatusChanged { is_open: bool },
    /// The round closed.
    Closed { cause: CloseCause },
    /// A countdown has to be scheduled; replaces any previous one.
    ArmTimer(PendingTimer),
    /// The countdown scheduled for the previous status has to be dropped.
    CancelTimer,
    /// Viewers must be told about the new deadline.
    TimerStarted(PendingTimer),
    /// Viewers must be told the countdown was cancelled.
    TimerStopped,
}

/// Outcome of planning an event against the current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundPlan {
    /// Nothing changes and nothing must be broadcast.
    Noop,
    /// Status must move from `from` to `to`, then `effects` run in order.
    Transition {
        from: RoundStatus,
        to: RoundStatus,
        effects: Vec<RoundEffect>,
    },
}

/// Error returned when an event cannot be applied in the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid round transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status at the time of the event.
    pub from: RoundStatus,
    /// Rejected event.
    pub event: RoundEvent,
}

/// Plan `event` against `current`.
///
/// Closing a closed round, stopping an absent timer and stale timer expiries
/// are [`RoundPlan::Noop`], so racing triggers resolve to a single transition.
pub fn plan(current: RoundStatus, event: RoundEvent) -> Result<RoundPlan, InvalidTransition> {
    use RoundEffect::*;

    let (to, effects) = match (current, event) {
        (RoundStatus::Closed, RoundEvent::Open { timer }) => {
            let mut effects = vec![StatusChanged { is_open: true }];
            if let Some(timer) = timer {
                effects.extend([ArmTimer(timer), TimerStarted(timer)]);
            }
            (RoundStatus::Open { timer }, effects)
        }
        (RoundStatus::Open { timer }, RoundEvent::CloseManual) => {
            let mut effects = Vec::with_capacity(4);
            if timer.is_some() {
                effects.extend([CancelTimer, TimerStopped]);
            }
            effects.extend([
                StatusChanged { is_open: false },
                Closed {
                    cause: CloseCause::Manual,
                },
            ]);
            (RoundStatus::Closed, effects)
        }
        (RoundStatus::Open { timer: Some(pending) }, RoundEvent::TimerExpired { token })
            if pending.token == token =>
        {
            (
                RoundStatus::Closed,
                vec![
                    StatusChanged { is_open: false },
                    Closed {
                        cause: CloseCause::Timer,
                    },
                ],
            )
        }
        (RoundStatus::Open { .. }, RoundEvent::StartTimer(timer)) => (
            RoundStatus::Open { timer: Some(timer) },
            vec![ArmTimer(timer), TimerStarted(timer)],
        ),
        (RoundStatus::Open { timer: Some(_) }, RoundEvent::StopTimer) => (
            RoundStatus::Open { timer: None },
            vec![CancelTimer, TimerStopped],
        ),
        (RoundStatus::Closed, RoundEvent::CloseManual)
        | (_, RoundEvent::TimerExpired { .. })
        | (_, RoundEvent::StopTimer) => return Ok(RoundPlan::Noop),
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(RoundPlan::Transition {
        from: current,
        to,
        effects,
    })
}

impl From<PendingTimerEntity> for PendingTimer {
    fn from(value: PendingTimerEntity) -> Self {
        Self {
            token: value.token,
            expires_at_epoch_seconds: value.expires_at_epoch_seconds,
        }
    }
}

impl From<PendingTimer> for PendingTimerEntity {
    fn from(value: PendingTimer) -> Self {
        Self {
            token: value.token,
            expires_at_epoch_seconds: value.expires_at_epoch_seconds,
        }
    }
}

impl From<RoundStatusEntity> for RoundStatus {
    fn from(value: RoundStatusEntity) -> Self {
        match value {
            RoundStatusEntity::Closed => RoundStatus::Closed,
            RoundStatusEntity::Open { timer } => RoundStatus::Open {
                timer: timer.map(Into::into),
            },
        }
    }
}

impl From<RoundStatus> for RoundStatusEntity {
    fn from(value: RoundStatus) -> Self {
        match value {
            RoundStatus::Closed => RoundStatusEntity::Closed,
            RoundStatus::Open { timer } => RoundStatusEntity::Open {
                timer: timer.map(Into::into),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(current: RoundStatus, event: RoundEvent) -> (RoundStatus, Vec<RoundEffect>) {
        match plan(current, event).unwrap() {
            RoundPlan::Transition { to, effects, .. } => (to, effects),
            RoundPlan::Noop => panic!("expected a transition for {event:?} from {current:?}"),
        }
    }

    fn open_with(timer: PendingTimer) -> RoundStatus {
        RoundStatus::Open { timer: Some(timer) }
    }

    #[test]
    fn open_without_timer() {
        let (to, effects) = transition(RoundStatus::Closed, RoundEvent::Open { timer: None });
        assert_eq!(to, RoundStatus::Open { timer: None });
        assert_eq!(effects, vec![RoundEffect::StatusChanged { is_open: true }]);
    }

    #[test]
    fn open_with_timer_arms_it() {
        let timer = PendingTimer::new(1_000);
        let (to, effects) = transition(
            RoundStatus::Closed,
            RoundEvent::Open { timer: Some(timer) },
        );
        assert_eq!(to, open_with(timer));
        assert_eq!(
            effects,
            vec![
                RoundEffect::StatusChanged { is_open: true },
                RoundEffect::ArmTimer(timer),
                RoundEffect::TimerStarted(timer),
            ]
        );
    }

    #[test]
    fn opening_an_open_round_is_invalid() {
        let err = plan(RoundStatus::Open { timer: None }, RoundEvent::Open { timer: None })
            .unwrap_err();
        assert_eq!(err.from, RoundStatus::Open { timer: None });
    }

    #[test]
    fn manual_close_cancels_pending_timer() {
        let timer = PendingTimer::new(1_000);
        let (to, effects) = transition(open_with(timer), RoundEvent::CloseManual);
        assert_eq!(to, RoundStatus::Closed);
        assert_eq!(
            effects,
            vec![
                RoundEffect::CancelTimer,
                RoundEffect::TimerStopped,
                RoundEffect::StatusChanged { is_open: false },
                RoundEffect::Closed {
                    cause: CloseCause::Manual
                },
            ]
        );
    }

    #[test]
    fn closing_twice_is_a_noop() {
        assert_eq!(
            plan(RoundStatus::Closed, RoundEvent::CloseManual),
            Ok(RoundPlan::Noop)
        );
        assert_eq!(
            plan(
                RoundStatus::Closed,
                RoundEvent::TimerExpired {
                    token: Uuid::new_v4()
                }
            ),
            Ok(RoundPlan::Noop)
        );
    }

    #[test]
    fn only_the_pending_timer_may_close() {
        let timer = PendingTimer::new(1_000);
        let stale = plan(
            open_with(timer),
            RoundEvent::TimerExpired {
                token: Uuid::new_v4(),
            },
        );
        assert_eq!(stale, Ok(RoundPlan::Noop));

        let cleared = plan(
            RoundStatus::Open { timer: None },
            RoundEvent::TimerExpired { token: timer.token },
        );
        assert_eq!(cleared, Ok(RoundPlan::Noop));

        let (to, effects) = transition(
            open_with(timer),
            RoundEvent::TimerExpired { token: timer.token },
        );
        assert_eq!(to, RoundStatus::Closed);
        assert!(effects.contains(&RoundEffect::Closed {
            cause: CloseCause::Timer
        }));
        assert!(!effects.contains(&RoundEffect::TimerStopped));
        assert!(!effects.contains(&RoundEffect::CancelTimer));
    }

    #[test]
    fn restarting_a_timer_replaces_the_deadline() {
        let first = PendingTimer::new(1_000);
        let second = PendingTimer::new(2_000);
        let (to, effects) = transition(open_with(first), RoundEvent::StartTimer(second));
        assert_eq!(to, open_with(second));
        assert_eq!(
            effects,
            vec![RoundEffect::ArmTimer(second), RoundEffect::TimerStarted(second)]
        );
    }

    #[test]
    fn timer_operations_on_closed_round() {
        assert!(plan(RoundStatus::Closed, RoundEvent::StartTimer(PendingTimer::new(5))).is_err());
        assert_eq!(
            plan(RoundStatus::Closed, RoundEvent::StopTimer),
            Ok(RoundPlan::Noop)
        );
        assert_eq!(
            plan(RoundStatus::Open { timer: None }, RoundEvent::StopTimer),
            Ok(RoundPlan::Noop)
        );
    }

    #[test]
    fn stop_timer_keeps_round_open() {
        let (to, effects) = transition(open_with(PendingTimer::new(9)), RoundEvent::StopTimer);
        assert_eq!(to, RoundStatus::Open { timer: None });
        assert_eq!(effects, vec![RoundEffect::CancelTimer, RoundEffect::TimerStopped]);
    }

    #[test]
    fn status_round_trips_through_entity() {
        let status = open_with(PendingTimer::new(42));
        let entity: RoundStatusEntity = status.into();
        assert_eq!(RoundStatus::from(entity), status);
    }
}
