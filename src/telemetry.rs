//! Telemetry utilities for operation timing and tracing spans.

use std::time::Instant;

/// Guard for timing an API operation and recording metrics.
///
/// Records operation latency when dropped.
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    /// Start timing an operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_operation(&self.operation, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for an API request on a matched route.
    pub fn operation(method: &str, route: &str) -> Span {
        info_span!("operation", method = %method, route = %route)
    }

    /// Span for a staff sanction.
    pub fn sanction(kind: &str, moderator: &str, target: i64) -> Span {
        info_span!("sanction", kind = %kind, moderator = %moderator, target = target)
    }

    /// Span for one pass of the expiry sweep.
    pub fn sweep() -> Span {
        info_span!("sweep")
    }
}
