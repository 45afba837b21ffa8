//! Round lifecycle: every trigger (organizer action or countdown expiry) goes
//! through [`apply`], which plans the event with the round state machine and
//! commits it with a compare-and-set on the store.

use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{game_store::StatusSwap, models::RoundEntity},
    dto::round::{ActiveTimer, RoundSummary},
    error::ServiceError,
    services::events,
    state::{
        SharedState,
        round_machine::{PendingTimer, RoundEffect, RoundEvent, RoundPlan, RoundStatus, plan},
    },
};

/// Result of applying one event to a round.
#[derive(Debug)]
pub struct Applied {
    /// Round as stored after the event.
    pub round: RoundEntity,
    /// `false` when the event was a no-op for the current status.
    pub changed: bool,
}

/// Open a closed round, optionally arming a countdown of `timer_seconds`.
pub async fn open(
    state: &SharedState,
    round_id: Uuid,
    timer_seconds: Option<u64>,
) -> Result<RoundSummary, ServiceError> {
    let (timer, countdown) = match timer_seconds {
        Some(seconds) => {
            let (timer, countdown) = new_timer(state, seconds)?;
            (Some(timer), Some(countdown))
        }
        None => (None, None),
    };
    let applied = apply_with(state, round_id, RoundEvent::Open { timer }, countdown).await?;
    Ok(applied.round.into())
}

/// Close a round. Closing a closed round succeeds without broadcasting.
pub async fn close(state: &SharedState, round_id: Uuid) -> Result<RoundSummary, ServiceError> {
    let applied = apply(state, round_id, RoundEvent::CloseManual).await?;
    Ok(applied.round.into())
}

/// Open a closed round or close an open one.
pub async fn toggle(state: &SharedState, round_id: Uuid) -> Result<RoundSummary, ServiceError> {
    let round = find_round(state, round_id).await?;
    if RoundStatus::from(round.status).is_open() {
        close(state, round_id).await
    } else {
        open(state, round_id, None).await
    }
}

/// Arm a countdown on an open round, replacing any pending one.
pub async fn start_timer(
    state: &SharedState,
    round_id: Uuid,
    seconds: u64,
) -> Result<RoundSummary, ServiceError> {
    let (timer, countdown) = new_timer(state, seconds)?;
    let applied =
        apply_with(state, round_id, RoundEvent::StartTimer(timer), Some(countdown)).await?;
    Ok(applied.round.into())
}

/// Cancel the countdown of a round. A round without countdown is left as is.
pub async fn stop_timer(state: &SharedState, round_id: Uuid) -> Result<RoundSummary, ServiceError> {
    let applied = apply(state, round_id, RoundEvent::StopTimer).await?;
    Ok(applied.round.into())
}

/// Rounds of a game with a pending deadline and the seconds left.
pub async fn active_timers(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<ActiveTimer>, ServiceError> {
    let store = state.store();
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound("game not found".into()));
    }
    let now = now_epoch_seconds();
    let timers = store
        .list_rounds(game_id)
        .await?
        .into_iter()
        .filter_map(|round| {
            let timer = RoundStatus::from(round.status).timer()?;
            Some(ActiveTimer {
                round_id: round.id,
                expires_at_epoch_seconds: timer.expires_at_epoch_seconds,
                remaining_seconds: timer.expires_at_epoch_seconds.saturating_sub(now),
            })
        })
        .collect();
    Ok(timers)
}

/// Re-arm the countdowns persisted on rounds, e.g. after a restart.
/// Deadlines already in the past fire right away through the normal close path.
pub async fn restore_timers(state: &SharedState) -> Result<usize, ServiceError> {
    let rounds = state.store().list_rounds_with_timer().await?;
    let mut restored = 0;
    for round in rounds {
        if let Some(timer) = RoundStatus::from(round.status).timer() {
            arm_timer(state, round.id, timer, remaining(timer));
            restored += 1;
        }
    }
    if restored > 0 {
        info!(restored, "round timers restored");
    }
    Ok(restored)
}

/// Apply `event` to a round atomically.
///
/// The status read, the plan and the compare-and-set are retried when another
/// trigger changed the round in between, so racing triggers resolve to exactly
/// one transition and the losers become no-ops. Transitions of one round run
/// one at a time, effects included.
pub async fn apply(
    state: &SharedState,
    round_id: Uuid,
    event: RoundEvent,
) -> Result<Applied, ServiceError> {
    apply_with(state, round_id, event, None).await
}

/// [`apply`], arming a countdown the event creates `countdown` from now.
/// Without it the countdown waits until its stored deadline.
async fn apply_with(
    state: &SharedState,
    round_id: Uuid,
    event: RoundEvent,
    countdown: Option<Duration>,
) -> Result<Applied, ServiceError> {
    let _transition = state.timers().lock_round(round_id).await;
    let store = state.store();
    let limit = state.config().cas_retry_limit();

    for attempt in 1..=limit {
        let round = find_round(state, round_id).await?;
        let current = RoundStatus::from(round.status);

        let (from, to, effects) = match plan(current, event)? {
            RoundPlan::Noop => {
                debug!(round_id = %round_id, ?event, "round event is a no-op");
                return Ok(Applied {
                    round,
                    changed: false,
                });
            }
            RoundPlan::Transition { from, to, effects } => (from, to, effects),
        };

        match store
            .compare_and_set_round_status(round_id, from.into(), to.into())
            .await?
        {
            StatusSwap::Swapped(updated) => {
                run_effects(state, &updated, from, &effects, countdown);
                if !to.is_open() && from.is_open() {
                    announce_if_finalising(state, updated.game_id).await;
                }
                return Ok(Applied {
                    round: updated,
                    changed: true,
                });
            }
            StatusSwap::Mismatch(stored) => {
                debug!(
                    round_id = %round_id,
                    attempt,
                    stored = ?stored,
                    "round status changed concurrently; retrying"
                );
            }
            StatusSwap::RoundNotFound => return Err(round_not_found()),
        }
    }

    warn!(round_id = %round_id, ?event, "giving up on contended round status update");
    Err(ServiceError::Conflict(
        "round status is changing too quickly, retry".into(),
    ))
}

fn run_effects(
    state: &SharedState,
    round: &RoundEntity,
    from: RoundStatus,
    effects: &[RoundEffect],
    countdown: Option<Duration>,
) {
    let (game_id, round_id) = (round.game_id, round.id);
    for effect in effects {
        match *effect {
            RoundEffect::StatusChanged { is_open } => {
                if is_open {
                    info!(round_id = %round_id, "round opened");
                }
                events::broadcast_round_status(state, game_id, round_id, is_open);
            }
            RoundEffect::Closed { cause } => {
                info!(round_id = %round_id, cause = cause.as_str(), "round closed");
                events::broadcast_round_closed(state, game_id, round_id, cause);
            }
            RoundEffect::ArmTimer(timer) => {
                let delay = countdown.unwrap_or_else(|| remaining(timer));
                arm_timer(state, round_id, timer, delay);
            }
            RoundEffect::CancelTimer => {
                if let Some(previous) = from.timer() {
                    state.timers().cancel(round_id, previous.token);
                }
            }
            RoundEffect::TimerStarted(timer) => {
                events::broadcast_timer_started(state, game_id, round_id, timer);
            }
            RoundEffect::TimerStopped => events::broadcast_timer_stopped(state, game_id, round_id),
        }
    }
}

async fn announce_if_finalising(state: &SharedState, game_id: Uuid) {
    match state.store().list_rounds(game_id).await {
        Ok(rounds) => {
            let all_closed = rounds
                .iter()
                .all(|round| !RoundStatus::from(round.status).is_open());
            if all_closed {
                info!(game_id = %game_id, "every round closed");
                events::broadcast_game_finalising(state, game_id);
            }
        }
        Err(err) => warn!(game_id = %game_id, error = %err, "failed to check remaining open rounds"),
    }
}

/// Schedule the expiry of `timer` after `delay`. The expiry closes the round
/// through [`apply`] like any other trigger, carrying the timer token.
fn arm_timer(state: &SharedState, round_id: Uuid, timer: PendingTimer, delay: Duration) {
    state
        .timers()
        .arm(round_id, timer.token, delay, expire(Arc::clone(state), round_id, timer.token));
}

fn expire(state: SharedState, round_id: Uuid, token: Uuid) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        match apply(&state, round_id, RoundEvent::TimerExpired { token }).await {
            Ok(Applied { changed: true, .. }) => {}
            Ok(Applied { changed: false, .. }) => {
                debug!(round_id = %round_id, token = %token, "stale round timer ignored");
            }
            Err(ServiceError::NotFound(_)) => {
                debug!(round_id = %round_id, "round timer fired for a deleted round");
            }
            Err(err) => {
                warn!(round_id = %round_id, error = %err, "round timer failed to close its round");
            }
        }
    })
}

/// Countdown of `seconds` starting now. The stored deadline is rounded up to
/// the next whole second, so it never precedes the actual expiry.
fn new_timer(state: &SharedState, seconds: u64) -> Result<(PendingTimer, Duration), ServiceError> {
    let max = state.config().max_timer_seconds();
    if seconds == 0 || seconds > max {
        return Err(ServiceError::InvalidInput(format!(
            "timer must last between 1 and {max} seconds"
        )));
    }
    let countdown = Duration::from_secs(seconds);
    let deadline = now_since_epoch() + countdown;
    let expires_at = deadline.as_secs() + u64::from(deadline.subsec_nanos() > 0);
    Ok((PendingTimer::new(expires_at), countdown))
}

/// Time left until a stored deadline, for countdowns restored from storage.
fn remaining(timer: PendingTimer) -> Duration {
    Duration::from_secs(timer.expires_at_epoch_seconds).saturating_sub(now_since_epoch())
}

fn now_since_epoch() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// Current wall-clock time in whole seconds since the Unix epoch.
pub fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

async fn find_round(state: &SharedState, round_id: Uuid) -> Result<RoundEntity, ServiceError> {
    state
        .store()
        .find_round(round_id)
        .await?
        .ok_or_else(round_not_found)
}

fn round_not_found() -> ServiceError {
    ServiceError::NotFound("round not found".into())
}
