//! Shared helpers for HTTP-level integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use quiz_arena_back::{
    config::AppConfig,
    dao::game_store::memory::MemoryQuizStore,
    routes,
    state::{AppState, SharedState},
};

/// Organizer secret configured for every test app.
pub const ORGANIZER_TOKEN: &str = "test-organizer-secret";

/// Full router over an empty in-memory store, plus the state behind it.
pub fn build_test_app() -> (Router, SharedState) {
    let state = AppState::new(
        AppConfig::with_organizer_token(ORGANIZER_TOKEN),
        Arc::new(MemoryQuizStore::new()),
    );
    (routes::router(state.clone()), state)
}

/// Send a request and decode the JSON body (`Value::Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Request authenticated as the organizer.
pub async fn organizer(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send(app, method, uri, &[("x-organizer-token", ORGANIZER_TOKEN)], body).await
}

/// Request authenticated as a team.
pub async fn team(
    app: &Router,
    token: &str,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    send(app, method, uri, &[("x-team-token", token)], body).await
}

/// Identifiers of a game with one closed round.
pub struct QuizFixture {
    pub game_id: String,
    pub join_code: String,
    pub round_id: String,
}

/// Create a game with the "Animals" round: a text question matching
/// `cat / dog` and a number question scored by `answer * 2`.
pub async fn create_quiz(app: &Router) -> QuizFixture {
    let (status, game) = organizer(
        app,
        Method::POST,
        "/organizer/games",
        Some(json!({"name": "Friday pub quiz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{game}");
    let game_id = game["id"].as_str().unwrap().to_string();
    let join_code = game["joinCode"].as_str().unwrap().to_string();

    let (status, round) = organizer(
        app,
        Method::POST,
        &format!("/organizer/games/{game_id}/rounds"),
        Some(json!({
            "name": "Animals",
            "questions": [
                {"id": "q1", "text": "Favourite pet?", "kind": "text", "validation": "cat / dog", "points": 1},
                {"id": "q2", "text": "Pick a number", "kind": "number", "validation": "answer * 2", "points": 1}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{round}");
    let round_id = round["id"].as_str().unwrap().to_string();

    QuizFixture {
        game_id,
        join_code,
        round_id,
    }
}

/// Register a team and return its token.
pub async fn join(app: &Router, join_code: &str, team_name: &str) -> String {
    let (status, joined) = send(
        app,
        Method::POST,
        "/play/join",
        &[],
        Some(json!({"joinCode": join_code, "teamName": team_name})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{joined}");
    joined["token"].as_str().unwrap().to_string()
}

/// Open a round without a countdown.
pub async fn open_round(app: &Router, round_id: &str) {
    let (status, body) = organizer(
        app,
        Method::POST,
        &format!("/organizer/rounds/{round_id}/open"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}
