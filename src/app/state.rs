//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::ArenaRegistry;
use crate::lobby::LobbyService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lobby: Arc<LobbyService>,
    pub arena_registry: Arc<ArenaRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let arena_registry = Arc::new(ArenaRegistry::new());
        let lobby = Arc::new(LobbyService::new(
            arena_registry.clone(),
            config.arena_min_players,
            config.arena_max_players,
        ));

        Self {
            config,
            lobby,
            arena_registry,
        }
    }
}
