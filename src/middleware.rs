use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::EpochMillis;
use crate::error::AppError;
use crate::identity::{client_identifier, fingerprint};
use crate::metrics::{CLIENT_LIMITER, REQUEST_LATENCY, REQUEST_TOTAL, record_decision, set_tracked};
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// Write the caller's quota onto a response
pub fn add_rate_limit_headers(
    headers: &mut HeaderMap,
    limit: u32,
    decision: &RateLimitDecision,
    now: EpochMillis,
) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_epoch_secs()));
    if !decision.allowed {
        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from(decision.retry_after_secs(now)),
        );
    }
}

// Per-client limit in front of every /api route.
// Trusted peers (the site backend calling on behalf of visitors) skip it.
pub async fn enforce_client_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if state.is_trusted_peer(peer.map(|addr| addr.ip())) {
        let response = next.run(request).await;
        REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
        return response;
    }

    let client = client_identifier(request.headers(), peer, state.trust_forwarded_for);

    let limiter = &state.client_limiter;
    let decision = limiter.check(&client, &state.client_rule);
    let now = limiter.now_millis();
    record_decision(CLIENT_LIMITER, decision.allowed);
    set_tracked(CLIENT_LIMITER, limiter.tracked());

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %fingerprint(&client),
            reset_time = decision.reset_time,
            "Client rate limit exceeded"
        );
        AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs(now),
        }
        .into_response()
    };

    add_rate_limit_headers(
        response.headers_mut(),
        state.client_rule.max_requests(),
        &decision,
        now,
    );

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}
