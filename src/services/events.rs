use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dto::sse::{
        GameFinalisingEvent, RoundClosedEvent, RoundStatusChangedEvent, ScoreChangedEvent,
        ServerEvent, SubmissionClearedEvent, SubmissionCountChangedEvent, TimerStartedEvent,
        TimerStoppedEvent,
    },
    dao::models::AnswerEntity,
    state::{SharedState, Topic, round_machine::{CloseCause, PendingTimer}},
};

pub const EVENT_HANDSHAKE: &str = "handshake";
pub const EVENT_ROUND_STATUS_CHANGED: &str = "round-status-changed";
pub const EVENT_ROUND_CLOSED: &str = "round-closed";
pub const EVENT_TIMER_STARTED: &str = "timer-started";
pub const EVENT_TIMER_STOPPED: &str = "timer-stopped";
pub const EVENT_SUBMISSION_COUNT_CHANGED: &str = "submission-count-changed";
pub const EVENT_SUBMISSION_CLEARED: &str = "submission-cleared";
pub const EVENT_GAME_FINALISING: &str = "game-finalising";
pub const EVENT_SCORE_CHANGED: &str = "score-changed";

/// Broadcast that a round opened or closed.
pub fn broadcast_round_status(state: &SharedState, game_id: Uuid, round_id: Uuid, is_open: bool) {
    let payload = RoundStatusChangedEvent { round_id, is_open };
    send_event(state, Topic::Game(game_id), EVENT_ROUND_STATUS_CHANGED, &payload);
}

/// Broadcast that a round closed, tagged with what closed it.
pub fn broadcast_round_closed(state: &SharedState, game_id: Uuid, round_id: Uuid, cause: CloseCause) {
    let payload = RoundClosedEvent {
        round_id,
        cause: cause.as_str().to_string(),
    };
    send_event(state, Topic::Game(game_id), EVENT_ROUND_CLOSED, &payload);
}

/// Broadcast the deadline of a freshly armed countdown.
pub fn broadcast_timer_started(
    state: &SharedState,
    game_id: Uuid,
    round_id: Uuid,
    timer: PendingTimer,
) {
    let payload = TimerStartedEvent {
        round_id,
        expires_at_epoch_seconds: timer.expires_at_epoch_seconds,
    };
    send_event(state, Topic::Game(game_id), EVENT_TIMER_STARTED, &payload);
}

/// Broadcast that a countdown was cancelled before expiring.
pub fn broadcast_timer_stopped(state: &SharedState, game_id: Uuid, round_id: Uuid) {
    let payload = TimerStoppedEvent { round_id };
    send_event(state, Topic::Game(game_id), EVENT_TIMER_STOPPED, &payload);
}

/// Broadcast the number of teams that submitted a round.
pub fn broadcast_submission_count(
    state: &SharedState,
    game_id: Uuid,
    round_id: Uuid,
    submitted_count: usize,
    total_teams: usize,
) {
    let payload = SubmissionCountChangedEvent {
        round_id,
        submitted_count,
        total_teams,
    };
    send_event(state, Topic::Game(game_id), EVENT_SUBMISSION_COUNT_CHANGED, &payload);
}

/// Broadcast that a team may submit a round again.
pub fn broadcast_submission_cleared(
    state: &SharedState,
    game_id: Uuid,
    round_id: Uuid,
    team_id: Uuid,
) {
    let payload = SubmissionClearedEvent { round_id, team_id };
    send_event(state, Topic::Game(game_id), EVENT_SUBMISSION_CLEARED, &payload);
}

/// Broadcast that every round of the game is closed.
pub fn broadcast_game_finalising(state: &SharedState, game_id: Uuid) {
    let payload = GameFinalisingEvent { game_id };
    send_event(state, Topic::Game(game_id), EVENT_GAME_FINALISING, &payload);
}

/// Broadcast an adjusted answer to the organizers watching the scoring grid.
pub fn broadcast_score_changed(state: &SharedState, game_id: Uuid, answer: &AnswerEntity) {
    let payload = ScoreChangedEvent {
        answer_id: answer.id,
        points: answer.points,
        bonus: answer.bonus,
        penalty: answer.penalty,
        notes: answer.notes.clone(),
        total: answer.total(),
    };
    send_event(state, Topic::Scoring(game_id), EVENT_SCORE_CHANGED, &payload);
}

fn send_event(state: &SharedState, topic: Topic, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(message) => {
            let delivered = state.fabric().publish(topic, message);
            debug!(%topic, event, delivered, "event published");
        }
        Err(err) => warn!(%topic, event, error = %err, "failed to serialize event payload"),
    }
}
