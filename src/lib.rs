//! Fixed-window rate limiting for the portfolio site's API.
//!
//! The [`rate_limit`] module holds the limiter itself; the rest wires it
//! into an axum service with a background sweeper, Prometheus metrics and
//! a per-client limit on the service's own routes.

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod sweeper;

pub use clock::{Clock, EpochMillis, ManualClock, SystemClock};
pub use error::AppError;
pub use rate_limit::{RateLimitDecision, RateLimitRule, RateLimiter, WindowRecord, WindowStore};
pub use state::AppState;
