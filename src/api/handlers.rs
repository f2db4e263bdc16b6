use std::sync::Arc;
use axum::{
    extract::State,
    response::Json,
    routing::get,
    Router,
};

use crate::broadcast::{BroadcastHub, FeedMessage};
use crate::companies::CompanyLadder;

#[derive(Clone)]
pub struct ApiState {
    pub hub: Arc<BroadcastHub>,
    pub ladder: Arc<CompanyLadder>,
}

// GET /api/health - Health check endpoint
pub async fn health_check(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "flip_socket_api",
        "companies": state.ladder.len(),
        "subscribers": state.hub.subscriber_count(),
        "timestamp": chrono::Utc::now()
    }))
}

// GET /api/snapshot - Latest feed message without holding a socket open
pub async fn get_snapshot(State(state): State<ApiState>) -> Json<FeedMessage> {
    Json(state.hub.snapshot())
}

// Create the API router
pub fn create_api_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/snapshot", get(get_snapshot))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
}
