use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;

// Short stable hash of an identifier, safe to put in logs (IPs and emails are not)
pub fn fingerprint(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..12].to_string()
}

// Resolve the caller's identifier for per-client limiting.
// x-forwarded-for is only honoured behind a trusted proxy, otherwise anyone can pick their own key.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
