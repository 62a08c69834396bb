//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/arenas", get(arenas_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_arenas: usize,
    active_players: usize,
    connected_sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_arenas: state.arena_registry.active_arenas(),
        active_players: state.arena_registry.total_players(),
        connected_sessions: state.lobby.connected_players(),
    })
}

// ============================================================================
// Arena listing
// ============================================================================

#[derive(Serialize)]
struct ArenaListResponse {
    arenas: Vec<ArenaSummary>,
}

#[derive(Serialize)]
struct ArenaSummary {
    arena_id: Uuid,
    player_count: usize,
}

async fn arenas_handler(State(state): State<AppState>) -> Json<ArenaListResponse> {
    let arenas = state
        .arena_registry
        .summaries()
        .into_iter()
        .map(|(arena_id, player_count)| ArenaSummary {
            arena_id,
            player_count,
        })
        .collect();

    Json(ArenaListResponse { arenas })
}
