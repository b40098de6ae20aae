use axum::{Json, extract::State, extract::rejection::JsonRejection};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::identity::fingerprint;
use crate::metrics::{CHECK_LIMITER, record_decision, set_tracked};
use crate::models::CheckRequest;
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;

// Admission check on behalf of another service (contact form, consultation booking, ...)
pub async fn check_handler(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<RateLimitDecision>> {
    // malformed JSON, negative or missing numbers all count as bad input
    let Json(payload) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let rule = payload.rule()?;

    let limiter = &state.check_limiter;
    let decision = limiter.check(&payload.identifier, &rule);
    record_decision(CHECK_LIMITER, decision.allowed);
    set_tracked(CHECK_LIMITER, limiter.tracked());

    tracing::debug!(
        identifier = %fingerprint(&payload.identifier),
        allowed = decision.allowed,
        remaining = decision.remaining,
        "Admission check"
    );

    Ok(Json(decision))
}
