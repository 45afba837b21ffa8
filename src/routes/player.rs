use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        game::{JoinRequest, JoinResponse},
        round::PlayerRoundView,
        scoring::TeamRoundScore,
        submission::{SubmissionResponse, SubmitAnswersRequest},
    },
    error::AppError,
    services::{game_service, scoring_service, submission_service},
    state::{SharedState, game::AuthenticatedTeam},
};

/// Header carrying the credential issued on join.
pub const TEAM_TOKEN_HEADER: &str = "x-team-token";

/// Endpoints used by teams. Everything but joining requires a team token.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/play/rounds", get(list_rounds))
        .route("/play/rounds/{id}/submit", post(submit_answers))
        .route("/play/rounds/{id}/scores", get(round_scores))
        .route_layer(middleware::from_fn_with_state(state, require_team_token))
        .route("/play/join", post(join))
}

/// Enter a game with its join code.
#[utoipa::path(
    post,
    path = "/play/join",
    tag = "player",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Team registered; keep the token", body = JoinResponse),
        (status = 404, description = "Unknown join code"),
        (status = 409, description = "Name taken or game inactive")
    )
)]
pub async fn join(
    State(state): State<SharedState>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        game_service::join(&state, &payload.join_code, &payload.team_name).await?,
    ))
}

/// Rounds of the team's game with their open and submitted flags.
#[utoipa::path(
    get,
    path = "/play/rounds",
    tag = "player",
    params(("X-Team-Token" = String, Header, description = "Token returned by /play/join")),
    responses((status = 200, description = "Rounds as seen by the team", body = [PlayerRoundView]))
)]
pub async fn list_rounds(
    State(state): State<SharedState>,
    Extension(team): Extension<AuthenticatedTeam>,
) -> Result<Json<Vec<PlayerRoundView>>, AppError> {
    Ok(Json(submission_service::player_rounds(&state, &team).await?))
}

/// Submit the team's answers for a round. Only the first submission counts.
#[utoipa::path(
    post,
    path = "/play/rounds/{id}/submit",
    tag = "player",
    params(("X-Team-Token" = String, Header, description = "Token returned by /play/join"),
    ("id" = Uuid, Path, description = "Round identifier")),
    request_body = SubmitAnswersRequest,
    responses(
        (status = 200, description = "Submission accepted", body = SubmissionResponse),
        (status = 409, description = "Submission rejected with its reason", body = SubmissionResponse)
    )
)]
pub async fn submit_answers(
    State(state): State<SharedState>,
    Extension(team): Extension<AuthenticatedTeam>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    let outcome = submission_service::submit(&state, &team, id, payload.into_answers()).await?;
    let status = if outcome.is_accepted() {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    Ok((status, Json(outcome.to_response(id))))
}

/// The team's own scores for a round.
#[utoipa::path(
    get,
    path = "/play/rounds/{id}/scores",
    tag = "player",
    params(("X-Team-Token" = String, Header, description = "Token returned by /play/join"),
    ("id" = Uuid, Path, description = "Round identifier")),
    responses((status = 200, description = "Per-question scores", body = TeamRoundScore))
)]
pub async fn round_scores(
    State(state): State<SharedState>,
    Extension(team): Extension<AuthenticatedTeam>,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamRoundScore>, AppError> {
    Ok(Json(
        scoring_service::team_round_score(&state, &team, id).await?,
    ))
}

/// Resolve the team token and expose the team identity to the handler.
async fn require_team_token(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(TEAM_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing team token header `X-Team-Token`".into()))?;
    let token = Uuid::parse_str(token.trim())
        .map_err(|_| AppError::Unauthorized("malformed team token".into()))?;

    let team = game_service::resolve_team(&state, token).await?;
    req.extensions_mut().insert(team);
    Ok(next.run(req).await)
}
