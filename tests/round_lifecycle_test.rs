//! Round opening, countdown expiry and close notifications.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use quiz_arena_back::{
    dto::sse::ServerEvent,
    services::events,
    state::{Topic, round_machine::RoundStatus},
};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

fn drain(receiver: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    std::iter::from_fn(|| receiver.try_recv().ok()).collect()
}

fn named<'a>(events: &'a [ServerEvent], name: &str) -> Vec<&'a ServerEvent> {
    events
        .iter()
        .filter(|event| event.event.as_deref() == Some(name))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn countdown_closes_the_round_for_early_subscribers() {
    let (app, state) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    let game_id = Uuid::parse_str(&quiz.game_id).unwrap();
    let mut subscriber = state.fabric().join(Topic::Game(game_id));

    let (status, round) = common::organizer(
        &app,
        Method::POST,
        &format!("/organizer/rounds/{}/open?timerSeconds=30", quiz.round_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{round}");
    assert_eq!(round["isOpen"], true);
    assert!(round["timerExpiresAtEpochSeconds"].is_u64());

    tokio::time::sleep(Duration::from_secs(10)).await;
    let (_, timers) = common::send(
        &app,
        Method::GET,
        &format!("/games/{}/timers", quiz.game_id),
        &[],
        None,
    )
    .await;
    assert_eq!(timers.as_array().unwrap().len(), 1);

    tokio::time::sleep(Duration::from_millis(19_900)).await;
    let (_, rounds) = common::organizer(
        &app,
        Method::GET,
        &format!("/organizer/games/{}/rounds", quiz.game_id),
        None,
    )
    .await;
    assert_eq!(rounds[0]["isOpen"], true);
    let early = drain(&mut subscriber.receiver);
    assert_eq!(named(&early, events::EVENT_TIMER_STARTED).len(), 1);
    assert!(named(&early, events::EVENT_ROUND_CLOSED).is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;

    let (_, rounds) = common::organizer(
        &app,
        Method::GET,
        &format!("/organizer/games/{}/rounds", quiz.game_id),
        None,
    )
    .await;
    assert_eq!(rounds[0]["isOpen"], false);

    let received = drain(&mut subscriber.receiver);
    let closed = named(&received, events::EVENT_ROUND_CLOSED);
    assert_eq!(closed.len(), 1);
    let payload: serde_json::Value = serde_json::from_str(&closed[0].data).unwrap();
    assert_eq!(payload["cause"], "timer");
    assert_eq!(payload["roundId"], quiz.round_id.as_str());
}

#[tokio::test(start_paused = true)]
async fn countdown_of_a_deleted_round_stays_silent() {
    let (app, state) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    let game_id = Uuid::parse_str(&quiz.game_id).unwrap();
    let round_id = Uuid::parse_str(&quiz.round_id).unwrap();

    let (status, _) = common::organizer(
        &app,
        Method::POST,
        &format!("/organizer/rounds/{}/open?timerSeconds=30", quiz.round_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // straight through the store, so the countdown is left armed
    assert!(state.store().delete_round(round_id).await.unwrap().is_some());
    let mut subscriber = state.fabric().join(Topic::Game(game_id));

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(drain(&mut subscriber.receiver).is_empty());
    assert!(state.timers().is_empty());
}

#[tokio::test]
async fn concurrent_countdown_restarts_leave_the_committed_one_armed() {
    let (app, state) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    common::open_round(&app, &quiz.round_id).await;
    let round_id = Uuid::parse_str(&quiz.round_id).unwrap();

    let uri = format!("/organizer/rounds/{}/timer", quiz.round_id);
    let mut handles = Vec::new();
    for seconds in 100..116 {
        let app = app.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            common::organizer(&app, Method::POST, &uri, Some(json!({"seconds": seconds})))
                .await
                .0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let round = state.store().find_round(round_id).await.unwrap().unwrap();
    let stored = RoundStatus::from(round.status).timer().unwrap();
    assert_eq!(state.timers().armed_token(round_id), Some(stored.token));
    assert_eq!(state.timers().len(), 1);
}

#[tokio::test]
async fn concurrent_closes_announce_once() {
    let (app, state) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    common::open_round(&app, &quiz.round_id).await;
    let game_id = Uuid::parse_str(&quiz.game_id).unwrap();
    let mut subscriber = state.fabric().join(Topic::Game(game_id));

    let uri = format!("/organizer/rounds/{}/close", quiz.round_id);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            common::organizer(&app, Method::POST, &uri, None).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let received = drain(&mut subscriber.receiver);
    assert_eq!(named(&received, events::EVENT_ROUND_CLOSED).len(), 1);
}

#[tokio::test]
async fn stopping_the_countdown_keeps_the_round_open() {
    let (app, _) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    common::open_round(&app, &quiz.round_id).await;

    let timer_uri = format!("/organizer/rounds/{}/timer", quiz.round_id);
    let (status, started) =
        common::organizer(&app, Method::POST, &timer_uri, Some(json!({"seconds": 45}))).await;
    assert_eq!(status, StatusCode::OK, "{started}");
    assert!(started["timerExpiresAtEpochSeconds"].is_u64());

    let (status, stopped) = common::organizer(&app, Method::DELETE, &timer_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stopped["isOpen"], true);
    assert!(stopped.get("timerExpiresAtEpochSeconds").is_none());
}

#[tokio::test]
async fn countdown_out_of_range_is_rejected() {
    let (app, _) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;

    let (status, _) = common::organizer(
        &app,
        Method::POST,
        &format!("/organizer/rounds/{}/open?timerSeconds=0", quiz.round_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
