use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, GaugeVec, Histogram, register_counter, register_counter_vec,
    register_gauge_vec, register_histogram,
};

// `limiter` label values
pub const CLIENT_LIMITER: &str = "client";
pub const CHECK_LIMITER: &str = "check";

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("portfolio_gateway_requests_total", "Total number of API requests").unwrap();
    pub static ref ADMISSIONS: CounterVec = register_counter_vec!(
        "portfolio_gateway_admissions_total",
        "Admission decisions by limiter and outcome",
        &["limiter", "outcome"]
    )
    .unwrap();
    pub static ref SWEPT_RECORDS: CounterVec = register_counter_vec!(
        "portfolio_gateway_swept_records_total",
        "Expired window records removed by the sweeper",
        &["limiter"]
    )
    .unwrap();
    pub static ref TRACKED_IDENTIFIERS: GaugeVec = register_gauge_vec!(
        "portfolio_gateway_tracked_identifiers",
        "Current number of window records",
        &["limiter"]
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "portfolio_gateway_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
}

// Count one admission outcome for the named limiter
pub fn record_decision(limiter: &str, allowed: bool) {
    let outcome = if allowed { "allowed" } else { "rejected" };
    ADMISSIONS.with_label_values(&[limiter, outcome]).inc();
}

pub fn set_tracked(limiter: &str, tracked: usize) {
    TRACKED_IDENTIFIERS
        .with_label_values(&[limiter])
        .set(tracked as f64);
}
