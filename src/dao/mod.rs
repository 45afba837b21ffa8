/// Quiz storage abstraction and its backends.
pub mod game_store;
/// Persisted entity definitions.
pub mod models;
/// Storage error types shared by every backend.
pub mod storage;
