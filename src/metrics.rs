//! Prometheus metrics collection for sanctiond.
//!
//! Metrics are registered once at startup into a process-wide registry and
//! exposed as text on the metrics HTTP endpoint.
//!
//! - `sanctiond_sanctions_total{kind}` - Sanctions applied or lifted by staff
//! - `sanctiond_sanctions_expired_total{axis}` - Temporary sanctions restored by the sweep
//! - `sanctiond_registrations_total` - Accepted registrations
//! - `sanctiond_notifications_failed_total` - Notifications that could not be delivered
//! - `sanctiond_api_errors_total{code}` - API error responses by error code
//! - `sanctiond_operation_duration_seconds{operation}` - API operation latency

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Sanctions applied or lifted, by kind.
pub static SANCTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Temporary sanctions restored by the expiry sweep, by axis.
pub static SANCTIONS_EXPIRED: OnceLock<IntCounterVec> = OnceLock::new();

/// Accepted registrations.
pub static REGISTRATIONS: OnceLock<IntCounter> = OnceLock::new();

/// Failed notification deliveries.
pub static NOTIFICATIONS_FAILED: OnceLock<IntCounter> = OnceLock::new();

/// API errors by error code.
pub static API_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// API operation latency.
pub static OPERATION_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls leave the first registration in place.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                    }
                }
            }
        };
    }

    register!(SANCTIONS, IntCounterVec::new(Opts::new("sanctiond_sanctions_total", "Sanctions applied or lifted by staff"), &["kind"]));
    register!(SANCTIONS_EXPIRED, IntCounterVec::new(Opts::new("sanctiond_sanctions_expired_total", "Temporary sanctions restored by the expiry sweep"), &["axis"]));
    register!(REGISTRATIONS, IntCounter::new("sanctiond_registrations_total", "Accepted registrations"));
    register!(NOTIFICATIONS_FAILED, IntCounter::new("sanctiond_notifications_failed_total", "Notifications that could not be delivered"));
    register!(API_ERRORS, IntCounterVec::new(Opts::new("sanctiond_api_errors_total", "API error responses by code"), &["code"]));
    register!(OPERATION_LATENCY, HistogramVec::new(
        HistogramOpts::new("sanctiond_operation_duration_seconds", "API operation latency")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Record a staff sanction.
#[inline]
pub fn record_sanction(kind: &str) {
    if let Some(c) = SANCTIONS.get() {
        c.with_label_values(&[kind]).inc();
    }
}

/// Record sanctions restored by the sweep.
#[inline]
pub fn record_expired(axis: &str, count: usize) {
    if let Some(c) = SANCTIONS_EXPIRED.get() {
        c.with_label_values(&[axis]).inc_by(count as u64);
    }
}

#[inline]
pub fn record_registration() {
    if let Some(c) = REGISTRATIONS.get() {
        c.inc();
    }
}

#[inline]
pub fn record_notification_failure() {
    if let Some(c) = NOTIFICATIONS_FAILED.get() {
        c.inc();
    }
}

/// Record an API error response.
#[inline]
pub fn record_api_error(code: &str) {
    if let Some(c) = API_ERRORS.get() {
        c.with_label_values(&[code]).inc();
    }
}

/// Record the latency of an API operation.
#[inline]
pub fn record_operation(operation: &str, duration_secs: f64) {
    if let Some(h) = OPERATION_LATENCY.get() {
        h.with_label_values(&[operation]).observe(duration_secs);
    }
}
