use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    middleware,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    routes::organizer::require_organizer_token,
    services::sse_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/games/{id}",
    tag = "sse",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Round lifecycle and submission events of the game", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown game")
    )
)]
/// Stream the player-facing events of a game.
pub async fn game_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_game(&state, id).await?;
    info!(game_id = %id, subscriber = %subscription.id, "new game SSE connection");
    Ok(sse_service::to_sse_stream(state, subscription))
}

#[utoipa::path(
    get,
    path = "/sse/games/{id}/scoring",
    tag = "sse",
    params(("X-Organizer-Token" = String, Header, description = "Organizer secret"),
    ("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Score edits made by organizers", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown game")
    )
)]
/// Stream the score edits of a game to organizers.
pub async fn scoring_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_scoring(&state, id).await?;
    info!(game_id = %id, subscriber = %subscription.id, "new scoring SSE connection");
    Ok(sse_service::to_sse_stream(state, subscription))
}

/// Configure the SSE endpoints. The scoring stream is organizer-only.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/games/{id}/scoring", get(scoring_stream))
        .route_layer(middleware::from_fn_with_state(
            state,
            require_organizer_token,
        ))
        .route("/sse/games/{id}", get(game_stream))
}
