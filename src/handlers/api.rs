use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::RelayAuth;
use crate::error::MonitorError;
use crate::models::slot::PersistedState;
use crate::services::monitor::{AvailabilityMonitor, RunReport};

// AppState struct containing shared resources
pub struct AppState {
    pub monitor: Arc<AvailabilityMonitor>,
    pub trigger_auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerParams {
    pub auth: Option<String>,
}

// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

// Latest persisted snapshot
pub async fn current_availability(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PersistedState>, StatusCode> {
    // File read and mutex wait stay off the async workers
    let store = Arc::clone(state.monitor.store());
    let loaded = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| {
            error!("State load task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    match loaded {
        Some(snapshot) => Ok(Json(PersistedState::from(&snapshot))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

// Run one check, typically called by an external scheduler
pub async fn trigger_check(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TriggerParams>,
) -> Result<Json<RunReport>, StatusCode> {
    if !RelayAuth::token_matches(params.auth.as_deref(), state.trigger_auth_token.as_deref()) {
        warn!("Rejected check trigger with invalid auth token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    info!("Received request to run an availability check");

    match state.monitor.run_once().await {
        Ok(report) => {
            info!(
                "Check finished: {} available, {} new",
                report.available,
                report.added.len()
            );
            Ok(Json(report))
        }
        Err(MonitorError::ScanInProgress) => {
            warn!("Check requested while another scan is running");
            Err(StatusCode::CONFLICT)
        }
        Err(err) => {
            error!("Availability check failed: {}", err);
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}
