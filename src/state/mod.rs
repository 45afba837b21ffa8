pub mod broadcast;
pub mod game;
pub mod round_machine;
pub mod timer;

use std::sync::Arc;

use crate::{config::AppConfig, dao::game_store::QuizStore};

pub use self::broadcast::{BroadcastFabric, Subscription, Topic};
pub use self::timer::RoundTimers;

pub type SharedState = Arc<AppState>;

/// Central application state: the store, the broadcast fabric and the
/// countdown scheduler shared by every request and timer task.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn QuizStore>,
    fabric: BroadcastFabric,
    timers: RoundTimers,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn QuizStore>) -> SharedState {
        Arc::new(Self {
            config,
            store,
            fabric: BroadcastFabric::new(),
            timers: RoundTimers::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the quiz store.
    pub fn store(&self) -> Arc<dyn QuizStore> {
        Arc::clone(&self.store)
    }

    /// Topic-scoped event fan-out.
    pub fn fabric(&self) -> &BroadcastFabric {
        &self.fabric
    }

    /// Pending round countdowns.
    pub fn timers(&self) -> &RoundTimers {
        &self.timers
    }
}
