/// OpenAPI documentation generation.
pub mod documentation;
/// Event payloads published on the broadcast fabric.
pub mod events;
/// Game, team and round management.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Open/close transitions and countdowns of rounds.
pub mod round_service;
/// Totals, leaderboard and manual adjustments.
pub mod scoring_service;
/// Server-Sent Events streams over broadcast topics.
pub mod sse_service;
/// One-shot submission admission.
pub mod submission_service;
