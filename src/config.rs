use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::rate_limit::RateLimitRule;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "portfolio-gateway")]
#[command(about = "Fixed-window rate limiting service for the portfolio API")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    // Port to run the server on
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    // Max requests per window for each client of this service
    #[arg(long, env = "GATEWAY_RATE_LIMIT", default_value_t = 60)]
    pub rate_limit: u32,

    // Window length in milliseconds
    #[arg(long, env = "GATEWAY_RATE_WINDOW_MS", default_value_t = 60_000)]
    pub rate_window_ms: u64,

    // Seconds between sweeps of expired windows
    #[arg(long, env = "GATEWAY_SWEEP_INTERVAL", default_value_t = 60)]
    pub sweep_interval: u64,

    // Key clients by the first x-forwarded-for hop (only behind a trusted proxy)
    #[arg(long, env = "GATEWAY_TRUST_FORWARDED_FOR", default_value_t = false)]
    pub trust_forwarded_for: bool,

    // Peer IPs exempt from the client limit, e.g. the site backend (comma-separated)
    #[arg(long, env = "GATEWAY_TRUSTED_CLIENTS", value_delimiter = ',')]
    pub trusted_clients: Vec<IpAddr>,
}

impl Args {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    // The rule this service applies to its own /api routes
    pub fn rule(&self) -> Result<RateLimitRule> {
        RateLimitRule::new(self.rate_window_ms, self.rate_limit)
            .map_err(|e| AppError::Config(format!("--rate-limit/--rate-window-ms: {e}")))
    }

    pub fn sweep_interval(&self) -> Result<Duration> {
        if self.sweep_interval == 0 {
            return Err(AppError::Config(
                "--sweep-interval must be greater than zero".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.sweep_interval))
    }
}
