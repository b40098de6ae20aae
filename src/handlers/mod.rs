use axum::{Router, middleware::from_fn_with_state, routing::{get, post}};
use std::sync::Arc;

use crate::middleware::enforce_client_limit;
use crate::state::AppState;

mod health;
mod metrics;
mod check;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use check::check_handler;

// Build the app router, everything under /api goes through the client limiter (trusted peers excepted)
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/rate-limit/check", post(check_handler))
        .layer(from_fn_with_state(state.clone(), enforce_client_limit));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .with_state(state)
}
