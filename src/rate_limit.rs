//! Fixed-window rate limiting.
//!
//! Every identifier owns at most one [`WindowRecord`]. The first request
//! opens a window of `window_ms`, later requests in that window bump the
//! counter until `max_requests` is reached, and anything past that is
//! rejected until the window's `reset_time`. Expired records are replaced
//! on the next access or dropped by [`RateLimiter::sweep_expired`].

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::Arc;

use crate::clock::{Clock, EpochMillis};
use crate::error::{AppError, Result};

// Window record - tracks requests per identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    pub count: u32,
    pub reset_time: EpochMillis,
}

impl WindowRecord {
    fn open(now: EpochMillis, window_ms: u64) -> Self {
        let window = i64::try_from(window_ms).unwrap_or(i64::MAX);
        Self {
            count: 1,
            reset_time: now.saturating_add(window),
        }
    }

    pub fn is_expired(&self, now: EpochMillis) -> bool {
        now >= self.reset_time
    }
}

/// Validated admission parameters. Both values are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    window_ms: u64,
    max_requests: u32,
}

impl RateLimitRule {
    pub fn new(window_ms: u64, max_requests: u32) -> Result<Self> {
        if window_ms == 0 {
            return Err(AppError::InvalidInput(
                "windowMs must be greater than zero".to_string(),
            ));
        }
        if max_requests == 0 {
            return Err(AppError::InvalidInput(
                "maxRequests must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            window_ms,
            max_requests,
        })
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: EpochMillis,
}

impl RateLimitDecision {
    /// Reset time in whole epoch seconds, rounded up.
    pub fn reset_epoch_secs(&self) -> i64 {
        self.reset_time.div_euclid(1000) + i64::from(self.reset_time.rem_euclid(1000) != 0)
    }

    /// Seconds a rejected caller should wait, never less than one.
    pub fn retry_after_secs(&self, now: EpochMillis) -> u64 {
        let wait_ms = self.reset_time.saturating_sub(now).max(0) as u64;
        wait_ms.div_ceil(1000).max(1)
    }
}

/// Shared handle to the window records.
///
/// Cloning is cheap and every clone points at the same map, so one store
/// can back several limiters.
#[derive(Debug, Clone, Default)]
pub struct WindowStore {
    records: Arc<DashMap<String, WindowRecord>>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> Option<WindowRecord> {
        self.records.get(identifier).map(|r| *r.value())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: WindowStore,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: WindowStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &WindowStore {
        &self.store
    }

    pub fn now_millis(&self) -> EpochMillis {
        self.clock.now_millis()
    }

    /// Decide whether `identifier` may make one more request under `rule`.
    ///
    /// The whole read-modify-write runs under the entry's shard lock, so
    /// concurrent checks for the same identifier never over-admit.
    pub fn check(&self, identifier: &str, rule: &RateLimitRule) -> RateLimitDecision {
        let now = self.clock.now_millis();
        let max = rule.max_requests();

        match self.store.records.entry(identifier.to_owned()) {
            Entry::Vacant(slot) => {
                let record = slot.insert(WindowRecord::open(now, rule.window_ms()));
                RateLimitDecision {
                    allowed: true,
                    remaining: max - 1,
                    reset_time: record.reset_time,
                }
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();

                // window expired..? start a new one
                if record.is_expired(now) {
                    *record = WindowRecord::open(now, rule.window_ms());
                    return RateLimitDecision {
                        allowed: true,
                        remaining: max - 1,
                        reset_time: record.reset_time,
                    };
                }

                // at or over the limit, leave the record alone
                if record.count >= max {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_time: record.reset_time,
                    };
                }

                record.count += 1;
                RateLimitDecision {
                    allowed: true,
                    remaining: max.saturating_sub(record.count),
                    reset_time: record.reset_time,
                }
            }
        }
    }

    /// Drop every expired record and return how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut removed = 0;
        self.store.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn tracked(&self) -> usize {
        self.store.len()
    }
}
