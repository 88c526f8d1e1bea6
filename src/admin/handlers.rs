use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::observability::metrics;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub version: String,
    pub alive: usize,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendStatus {
    pub endpoint: String,
    pub alive: bool,
}

/// Body of an administrative liveness override.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub endpoint: String,
    pub alive: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let status = state.pool.status();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        alive: status.alive,
        total: status.total,
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let statuses = state
        .pool
        .snapshot()
        .iter()
        .map(|b| BackendStatus {
            endpoint: b.endpoint().to_string(),
            alive: b.is_alive(),
        })
        .collect();

    Json(statuses)
}

pub async fn set_backend_status(
    State(state): State<AdminState>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<BackendStatus>, StatusCode> {
    if !state.pool.mark_status(&update.endpoint, update.alive) {
        return Err(StatusCode::NOT_FOUND);
    }
    metrics::record_backend_health(&update.endpoint, update.alive);

    tracing::info!(
        backend = %update.endpoint,
        alive = update.alive,
        "Backend status set by admin"
    );
    Ok(Json(BackendStatus {
        endpoint: update.endpoint,
        alive: update.alive,
    }))
}
