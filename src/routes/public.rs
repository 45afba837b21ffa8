use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{round::ActiveTimer, scoring::LeaderboardEntry},
    error::AppError,
    services::{round_service, scoring_service},
    state::SharedState,
};

/// Read-only views anyone following a game may pull, e.g. after reconnecting.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games/{id}/leaderboard", get(leaderboard))
        .route("/games/{id}/timers", get(active_timers))
}

/// Teams ranked by total score, ties kept in join order.
#[utoipa::path(
    get,
    path = "/games/{id}/leaderboard",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Leaderboard", body = [LeaderboardEntry]),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    Ok(Json(scoring_service::leaderboard(&state, id).await?))
}

/// Rounds of the game with a running countdown.
#[utoipa::path(
    get,
    path = "/games/{id}/timers",
    tag = "public",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Pending deadlines", body = [ActiveTimer]))
)]
pub async fn active_timers(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActiveTimer>>, AppError> {
    Ok(Json(round_service::active_timers(&state, id).await?))
}
