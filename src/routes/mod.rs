use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod organizer;
pub mod player;
pub mod public;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(public::router())
        .merge(sse::router(state.clone()))
        .merge(organizer::router(state.clone()))
        .merge(player::router(state.clone()))
        .merge(docs::router())
        .with_state(state)
}
