use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        game::{CreateGameRequest, GameSummary, RenameRequest, SetActiveRequest, TeamSummary},
        round::{
            CreateRoundRequest, OpenRoundRequest, ReorderRoundsRequest, ReplaceQuestionsRequest,
            RoundSummary, StartTimerRequest, into_specs,
        },
        scoring::{AdjustAnswerRequest, AnswerView},
        submission::SubmissionStatusEntry,
    },
    error::AppError,
    services::{game_service, round_service, scoring_service, submission_service},
    state::SharedState,
};

/// Header carrying the organizer secret.
pub const ORGANIZER_TOKEN_HEADER: &str = "x-organizer-token";

/// Organizer-only management endpoints: games, teams, rounds, scoring.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/organizer/games", get(list_games).post(create_game))
        .route("/organizer/games/{id}", get(get_game).delete(delete_game))
        .route("/organizer/games/{id}/active", put(set_active))
        .route("/organizer/games/{id}/name", put(rename_game))
        .route("/organizer/games/{id}/teams", get(list_teams))
        .route(
            "/organizer/games/{id}/rounds",
            get(list_rounds).post(create_round),
        )
        .route("/organizer/games/{id}/rounds/order", put(reorder_rounds))
        .route("/organizer/games/{id}/answers", get(answer_grid))
        .route("/organizer/teams/{id}", delete(delete_team))
        .route("/organizer/teams/{id}/name", put(rename_team))
        .route("/organizer/rounds/{id}", delete(delete_round))
        .route("/organizer/rounds/{id}/name", put(rename_round))
        .route("/organizer/rounds/{id}/questions", put(replace_questions))
        .route("/organizer/rounds/{id}/open", post(open_round))
        .route("/organizer/rounds/{id}/close", post(close_round))
        .route("/organizer/rounds/{id}/toggle", post(toggle_round))
        .route(
            "/organizer/rounds/{id}/timer",
            post(start_timer).delete(stop_timer),
        )
        .route("/organizer/rounds/{id}/submissions", get(submission_status))
        .route(
            "/organizer/rounds/{id}/teams/{team_id}/resubmit",
            post(grant_resubmit),
        )
        .route("/organizer/answers/{id}", patch(adjust_answer))
        .route_layer(middleware::from_fn_with_state(
            state,
            require_organizer_token,
        ))
}

/// List every game.
#[utoipa::path(
    get,
    path = "/organizer/games",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret")),
    responses((status = 200, description = "Games, oldest first", body = [GameSummary]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameSummary>>, AppError> {
    Ok(Json(game_service::list_games(&state).await?))
}

/// Create a game and draw its join code.
#[utoipa::path(
    post,
    path = "/organizer/games",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret")),
    request_body = CreateGameRequest,
    responses(
        (status = 200, description = "Game created", body = GameSummary),
        (status = 400, description = "Invalid name")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<GameSummary>, AppError> {
    payload.validate()?;
    Ok(Json(game_service::create_game(&state, &payload.name).await?))
}

#[utoipa::path(
    get,
    path = "/organizer/games/{id}",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game", body = GameSummary),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSummary>, AppError> {
    Ok(Json(game_service::get_game(&state, id).await?))
}

/// Delete a game with its rounds, teams and answers.
#[utoipa::path(
    delete,
    path = "/organizer/games/{id}",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 204, description = "Game deleted"), (status = 404, description = "Unknown game"))
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Allow or refuse new teams.
#[utoipa::path(
    put,
    path = "/organizer/games/{id}/active",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    request_body = SetActiveRequest,
    responses((status = 200, description = "Game updated", body = GameSummary))
)]
pub async fn set_active(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActiveRequest>,
) -> Result<Json<GameSummary>, AppError> {
    Ok(Json(
        game_service::set_active(&state, id, payload.active).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/organizer/games/{id}/name",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Game renamed", body = GameSummary),
        (status = 400, description = "Invalid name"),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn rename_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<GameSummary>, AppError> {
    payload.validate()?;
    Ok(Json(
        game_service::rename_game(&state, id, &payload.name).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/organizer/games/{id}/teams",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Teams in join order", body = [TeamSummary]))
)]
pub async fn list_teams(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TeamSummary>>, AppError> {
    Ok(Json(game_service::list_teams(&state, id).await?))
}

/// Rename a team. Names stay unique within its game.
#[utoipa::path(
    put,
    path = "/organizer/teams/{id}/name",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Team identifier")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Team renamed", body = TeamSummary),
        (status = 400, description = "Invalid name"),
        (status = 404, description = "Unknown team"),
        (status = 409, description = "Name already used in the game")
    )
)]
pub async fn rename_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<TeamSummary>, AppError> {
    payload.validate()?;
    Ok(Json(
        game_service::rename_team(&state, id, &payload.name).await?,
    ))
}

/// Remove a team and its answers.
#[utoipa::path(
    delete,
    path = "/organizer/teams/{id}",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Team identifier")),
    responses((status = 204, description = "Team deleted"), (status = 404, description = "Unknown team"))
)]
pub async fn delete_team(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_service::delete_team(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/organizer/games/{id}/rounds",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Rounds in display order", body = [RoundSummary]))
)]
pub async fn list_rounds(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RoundSummary>>, AppError> {
    Ok(Json(game_service::list_rounds(&state, id).await?))
}

/// Append a closed round to the game.
#[utoipa::path(
    post,
    path = "/organizer/games/{id}/rounds",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    request_body = CreateRoundRequest,
    responses(
        (status = 200, description = "Round created", body = RoundSummary),
        (status = 400, description = "Invalid questions")
    )
)]
pub async fn create_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateRoundRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    payload.validate()?;
    let questions = into_specs(payload.questions)?;
    Ok(Json(
        game_service::create_round(&state, id, &payload.name, questions).await?,
    ))
}

/// Set the display order of the rounds.
#[utoipa::path(
    put,
    path = "/organizer/games/{id}/rounds/order",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    request_body = ReorderRoundsRequest,
    responses(
        (status = 200, description = "Rounds in their new order", body = [RoundSummary]),
        (status = 400, description = "Order does not list every round exactly once")
    )
)]
pub async fn reorder_rounds(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderRoundsRequest>,
) -> Result<Json<Vec<RoundSummary>>, AppError> {
    Ok(Json(
        game_service::reorder_rounds(&state, id, payload.round_ids).await?,
    ))
}

/// Every answer of the game, for the scoring panel.
#[utoipa::path(
    get,
    path = "/organizer/games/{id}/answers",
    tag = "scoring",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Answers with totals", body = [AnswerView]))
)]
pub async fn answer_grid(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AnswerView>>, AppError> {
    Ok(Json(scoring_service::answer_grid(&state, id).await?))
}

/// Replace every question of a round.
#[utoipa::path(
    put,
    path = "/organizer/rounds/{id}/questions",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    request_body = ReplaceQuestionsRequest,
    responses(
        (status = 200, description = "Round updated", body = RoundSummary),
        (status = 409, description = "An answered question would be removed")
    )
)]
pub async fn replace_questions(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceQuestionsRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    payload.validate()?;
    let questions = into_specs(payload.questions)?;
    Ok(Json(
        game_service::replace_questions(&state, id, questions).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/organizer/rounds/{id}",
    tag = "organizer",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    responses((status = 204, description = "Round deleted"), (status = 404, description = "Unknown round"))
)]
pub async fn delete_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_service::delete_round(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/organizer/rounds/{id}/name",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Round renamed", body = RoundSummary),
        (status = 400, description = "Invalid name"),
        (status = 404, description = "Unknown round")
    )
)]
pub async fn rename_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    payload.validate()?;
    Ok(Json(
        game_service::rename_round(&state, id, &payload.name).await?,
    ))
}

/// Open a round, optionally with a countdown.
#[utoipa::path(
    post,
    path = "/organizer/rounds/{id}/open",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier"),
    ("timerSeconds" = Option<u64>, Query, description = "Countdown armed with the opening")),
    responses(
        (status = 200, description = "Round opened", body = RoundSummary),
        (status = 400, description = "Countdown out of range"),
        (status = 409, description = "Round already open")
    )
)]
pub async fn open_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<OpenRoundRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    Ok(Json(
        round_service::open(&state, id, query.timer_seconds).await?,
    ))
}

/// Close a round. Closing a closed round is a no-op.
#[utoipa::path(
    post,
    path = "/organizer/rounds/{id}/close",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    responses((status = 200, description = "Round closed", body = RoundSummary))
)]
pub async fn close_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSummary>, AppError> {
    Ok(Json(round_service::close(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/organizer/rounds/{id}/toggle",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    responses((status = 200, description = "Round toggled", body = RoundSummary))
)]
pub async fn toggle_round(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSummary>, AppError> {
    Ok(Json(round_service::toggle(&state, id).await?))
}

/// Arm a countdown on an open round, replacing any pending one.
#[utoipa::path(
    post,
    path = "/organizer/rounds/{id}/timer",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    request_body = StartTimerRequest,
    responses(
        (status = 200, description = "Countdown armed", body = RoundSummary),
        (status = 409, description = "Round is closed")
    )
)]
pub async fn start_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartTimerRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    Ok(Json(
        round_service::start_timer(&state, id, payload.seconds).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/organizer/rounds/{id}/timer",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    responses((status = 200, description = "Countdown cancelled", body = RoundSummary))
)]
pub async fn stop_timer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundSummary>, AppError> {
    Ok(Json(round_service::stop_timer(&state, id).await?))
}

/// Which teams submitted the round.
#[utoipa::path(
    get,
    path = "/organizer/rounds/{id}/submissions",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier")),
    responses((status = 200, description = "Submission state per team", body = [SubmissionStatusEntry]))
)]
pub async fn submission_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SubmissionStatusEntry>>, AppError> {
    Ok(Json(
        submission_service::submission_status(&state, id).await?,
    ))
}

/// Let a team submit the round once more.
#[utoipa::path(
    post,
    path = "/organizer/rounds/{id}/teams/{team_id}/resubmit",
    tag = "rounds",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Round identifier"),
    ("team_id" = Uuid, Path, description = "Team identifier")),
    responses((status = 204, description = "Resubmission granted"))
)]
pub async fn grant_resubmit(
    State(state): State<SharedState>,
    Path((id, team_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    submission_service::grant_resubmit(&state, id, team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Adjust the scoring fields of an answer.
#[utoipa::path(
    patch,
    path = "/organizer/answers/{id}",
    tag = "scoring",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Answer identifier")),
    request_body = AdjustAnswerRequest,
    responses(
        (status = 200, description = "Updated answer with its total", body = AnswerView),
        (status = 404, description = "Unknown answer")
    )
)]
pub async fn adjust_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustAnswerRequest>,
) -> Result<Json<AnswerView>, AppError> {
    payload.validate()?;
    Ok(Json(
        scoring_service::adjust(&state, id, payload.into()).await?,
    ))
}

/// Reject requests without the organizer secret.
pub async fn require_organizer_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ORGANIZER_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing organizer token header `X-Organizer-Token`".into())
        })?;

    if !token_matches(provided, state.config().organizer_token()) {
        return Err(AppError::Forbidden("invalid organizer token".into()));
    }
    Ok(next.run(req).await)
}

/// Compare secrets in time independent of where they first differ.
fn token_matches(provided: &str, expected: &str) -> bool {
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}
