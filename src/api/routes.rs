//! Router construction

use axum::{
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::{handlers, ui};
use crate::AppState;

/// Build the balancer router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ui::index_page))
        .route("/health", get(handlers::health_status))
        .route("/process", any(handlers::process))
        .route("/add_instance", post(handlers::add_instance))
        .route("/remove_instance", post(handlers::remove_instance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
