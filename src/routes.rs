use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::api::{current_availability, health_check, trigger_check, AppState};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    if app_state.trigger_auth_token.is_none() {
        info!("No trigger auth token configured - /check is open");
    }

    Router::new()
        .route("/health", get(health_check))
        .route("/availability", get(current_availability))
        .route("/check", post(trigger_check))
        .with_state(app_state)
}
