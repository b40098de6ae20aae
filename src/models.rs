use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::rate_limit::RateLimitRule;

// Admission check request format
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub identifier: String,
    pub window_ms: u64,
    pub max_requests: u32,
}

impl CheckRequest {
    pub fn rule(&self) -> Result<RateLimitRule> {
        if self.identifier.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "identifier must not be empty".to_string(),
            ));
        }
        RateLimitRule::new(self.window_ms, self.max_requests)
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub tracked_identifiers: usize,
    pub tracked_clients: usize,
}
