//! Join, submit and score a round over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn submitted_answers_are_scored_on_the_leaderboard() {
    let (app, _) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    let token = common::join(&app, &quiz.join_code, "Owls").await;
    common::open_round(&app, &quiz.round_id).await;

    let (status, response) = common::team(
        &app,
        &token,
        Method::POST,
        &format!("/play/rounds/{}/submit", quiz.round_id),
        Some(json!({"q1": "Dog", "q2": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["status"], "accepted");
    assert_eq!(response["answerCount"], 2);

    let (status, scores) = common::team(
        &app,
        &token,
        Method::GET,
        &format!("/play/rounds/{}/scores", quiz.round_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scores["answers"][0]["points"], 1.0);
    assert_eq!(scores["answers"][1]["points"], 10.0);

    let (status, board) = common::send(
        &app,
        Method::GET,
        &format!("/games/{}/leaderboard", quiz.game_id),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["teamName"], "Owls");
    assert_eq!(board[0]["total"], 11.0);
    assert_eq!(board[0]["rank"], 1);
}

#[tokio::test]
async fn join_code_is_case_insensitive_and_names_are_unique() {
    let (app, _) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    common::join(&app, &quiz.join_code.to_lowercase(), "Owls").await;

    let (status, _) = common::send(
        &app,
        Method::POST,
        "/play/join",
        &[],
        Some(json!({"joinCode": quiz.join_code, "teamName": "Owls"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn organizer_adjustment_changes_the_total() {
    let (app, _) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    let token = common::join(&app, &quiz.join_code, "Owls").await;
    common::open_round(&app, &quiz.round_id).await;
    common::team(
        &app,
        &token,
        Method::POST,
        &format!("/play/rounds/{}/submit", quiz.round_id),
        Some(json!({"q1": "horse", "q2": "1"})),
    )
    .await;

    let (_, grid) = common::organizer(
        &app,
        Method::GET,
        &format!("/organizer/games/{}/answers", quiz.game_id),
        None,
    )
    .await;
    let first = grid[0]["id"].as_str().unwrap().to_string();

    let (status, adjusted) = common::organizer(
        &app,
        Method::PATCH,
        &format!("/organizer/answers/{first}"),
        Some(json!({"bonus": 3, "penalty": 0.5, "notes": "close enough"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{adjusted}");
    assert_eq!(adjusted["notes"], "close enough");

    let (_, board) = common::send(
        &app,
        Method::GET,
        &format!("/games/{}/leaderboard", quiz.game_id),
        &[],
        None,
    )
    .await;
    // horse scores 0, 1 * 2 scores 2, then +3 -0.5
    assert_eq!(board[0]["total"], 4.5);
}

#[tokio::test]
async fn corrected_answer_text_is_scored_again() {
    let (app, _) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    let token = common::join(&app, &quiz.join_code, "Owls").await;
    common::open_round(&app, &quiz.round_id).await;
    common::team(
        &app,
        &token,
        Method::POST,
        &format!("/play/rounds/{}/submit", quiz.round_id),
        Some(json!({"q1": "dgo"})),
    )
    .await;

    let (_, grid) = common::organizer(
        &app,
        Method::GET,
        &format!("/organizer/games/{}/answers", quiz.game_id),
        None,
    )
    .await;
    let typo = grid
        .as_array()
        .unwrap()
        .iter()
        .find(|answer| answer["questionId"] == "q1")
        .unwrap();
    assert_eq!(typo["points"], 0.0);

    let (status, adjusted) = common::organizer(
        &app,
        Method::PATCH,
        &format!("/organizer/answers/{}", typo["id"].as_str().unwrap()),
        Some(json!({"rawText": "dog"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{adjusted}");
    assert_eq!(adjusted["rawText"], "dog");
    assert_eq!(adjusted["points"], 1.0);
    assert_eq!(adjusted["total"], 1.0);
}

#[tokio::test]
async fn renames_apply_and_team_names_stay_unique() {
    let (app, _) = common::build_test_app();
    let quiz = common::create_quiz(&app).await;
    common::join(&app, &quiz.join_code, "Owls").await;
    common::join(&app, &quiz.join_code, "Bats").await;

    let (status, game) = common::organizer(
        &app,
        Method::PUT,
        &format!("/organizer/games/{}/name", quiz.game_id),
        Some(json!({"name": "Saturday quiz"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{game}");
    assert_eq!(game["name"], "Saturday quiz");
    assert_eq!(game["joinCode"], quiz.join_code.as_str());

    let (status, round) = common::organizer(
        &app,
        Method::PUT,
        &format!("/organizer/rounds/{}/name", quiz.round_id),
        Some(json!({"name": "Pets"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{round}");
    assert_eq!(round["name"], "Pets");

    let (_, teams) = common::organizer(
        &app,
        Method::GET,
        &format!("/organizer/games/{}/teams", quiz.game_id),
        None,
    )
    .await;
    let bats = teams[1]["id"].as_str().unwrap().to_string();
    let rename = format!("/organizer/teams/{bats}/name");

    let (status, _) =
        common::organizer(&app, Method::PUT, &rename, Some(json!({"name": "Owls"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) =
        common::organizer(&app, Method::PUT, &rename, Some(json!({"name": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, renamed) =
        common::organizer(&app, Method::PUT, &rename, Some(json!({"name": "Foxes"}))).await;
    assert_eq!(status, StatusCode::OK, "{renamed}");
    assert_eq!(renamed["name"], "Foxes");
}
