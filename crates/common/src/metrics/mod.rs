//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms
//! and standardized naming conventions.

use crate::errors::AppError;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CampusDesk metrics
pub const METRICS_PREFIX: &str = "campusdesk";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.00, 30.00,
];

/// Buckets for language model latency (typically much slower)
pub const MODEL_BUCKETS: &[f64] = &[
    0.250, 0.500, 1.000, 2.000, 5.000, 10.00, 20.00, 30.00, 60.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_chat_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Chat queries answered, by role and outcome"
    );

    describe_histogram!(
        format!("{}_model_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Language model call latency in seconds"
    );

    describe_counter!(
        format!("{}_model_fallbacks_total", METRICS_PREFIX),
        Unit::Count,
        "Responses replaced by the fallback text"
    );

    describe_counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        Unit::Count,
        "Login attempts by role and outcome"
    );

    describe_counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Accepted uploads by file type"
    );

    describe_counter!(
        format!("{}_import_rows_total", METRICS_PREFIX),
        Unit::Count,
        "Imported student rows by action"
    );

    describe_counter!(
        format!("{}_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Errors returned to callers by code and category"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one answered chat query
pub fn record_chat(role: &str, outcome: &str) {
    counter!(
        format!("{}_chat_queries_total", METRICS_PREFIX),
        "role" => role.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a language model call
pub fn record_model_call(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    histogram!(
        format!("{}_model_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status
    )
    .record(duration_secs);
}

/// Record a response replaced by the fallback text
pub fn record_fallback(reason: &str) {
    counter!(
        format!("{}_model_fallbacks_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a login attempt
pub fn record_login(role: &str, success: bool) {
    counter!(
        format!("{}_logins_total", METRICS_PREFIX),
        "role" => role.to_string(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

/// Record an accepted upload
pub fn record_upload(kind: &str) {
    counter!(
        format!("{}_uploads_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record the row counts of a finished import
pub fn record_import(created: usize, updated: usize, skipped: usize) {
    for (action, rows) in [("created", created), ("updated", updated), ("skipped", skipped)] {
        counter!(
            format!("{}_import_rows_total", METRICS_PREFIX),
            "action" => action
        )
        .increment(rows as u64);
    }
}

/// Record an error rendered to a caller
pub fn record_error(error: &AppError) {
    counter!(
        format!("{}_errors_total", METRICS_PREFIX),
        "code" => format!("{:?}", error.code()),
        "category" => error.category().as_str()
    )
    .increment(1);
}
