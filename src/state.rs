use std::net::IpAddr;

use crate::rate_limit::{RateLimitRule, RateLimiter};

// app's shared state

pub struct AppState {
    pub client_limiter: RateLimiter, // callers of /api, keyed by client IP
    pub check_limiter: RateLimiter,  // identifiers submitted to the check endpoint
    pub client_rule: RateLimitRule,
    pub trust_forwarded_for: bool,
    pub trusted_clients: Vec<IpAddr>, // peers that bypass the client limit
}

impl AppState {
    pub fn is_trusted_peer(&self, peer: Option<IpAddr>) -> bool {
        peer.is_some_and(|ip| self.trusted_clients.contains(&ip))
    }
}
