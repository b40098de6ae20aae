use axum::http::header;
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};

use crate::error::Result;

pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let body = encoder.encode_to_string(&metric_families)?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}
