use axum::{extract::State, Json};
use serde::Serialize;

use super::AppState;
use crate::registry::Chain;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// GET /
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "VANTA backend is running".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub chains: Vec<&'static str>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        chains: Chain::ALL.iter().map(|c| c.as_str()).collect(),
    })
}
