use serde::Serialize;
use utoipa::ToSchema;

/// Body of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` when the store answers, `degraded` otherwise.
    pub status: String,
    /// Number of round countdowns pending in this process.
    pub pending_timers: usize,
}

impl HealthResponse {
    /// Store reachable.
    pub fn ok(pending_timers: usize) -> Self {
        Self {
            status: "ok".to_string(),
            pending_timers,
        }
    }

    /// Store unreachable; rounds and submissions will fail until it recovers.
    pub fn degraded(pending_timers: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            pending_timers,
        }
    }

    /// Whether the store answered.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
