use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the store and report whether the backend can serve rounds.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let pending_timers = state.timers().len();
    match state.store().health_check().await {
        Ok(()) => HealthResponse::ok(pending_timers),
        Err(err) => {
            warn!(error = %err, "storage health check failed");
            HealthResponse::degraded(pending_timers)
        }
    }
}
