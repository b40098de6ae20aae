use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::metrics::{SWEPT_RECORDS, set_tracked};
use crate::rate_limit::RateLimiter;

// One sweep pass - drop expired windows and refresh the gauge
pub fn sweep_once(name: &str, limiter: &RateLimiter) -> usize {
    let removed = limiter.sweep_expired();
    if removed > 0 {
        SWEPT_RECORDS.with_label_values(&[name]).inc_by(removed as f64);
    }
    set_tracked(name, limiter.tracked());
    removed
}

// Background sweeper - runs until the returned handle is aborted
pub fn spawn_sweeper(name: &'static str, limiter: RateLimiter, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately, nothing to sweep yet
        ticker.tick().await;

        tracing::info!(limiter = name, interval = ?every, "Window sweeper started");

        loop {
            ticker.tick().await;
            let removed = sweep_once(name, &limiter);
            tracing::debug!(
                limiter = name,
                removed,
                tracked = limiter.tracked(),
                "Swept expired windows"
            );
        }
    })
}
