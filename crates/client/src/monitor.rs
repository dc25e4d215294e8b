//! Telemetry sink for guarded call outcomes.

use fusebox_types::Event;

/// Receives one notification per sampled guarded call. Implementations
/// forward to whatever telemetry pipeline the application uses.
pub trait Monitor: Send + Sync {
	fn record_request(&self, breaker: &str, event: Event, latency: f64);
}

/// Discards everything; the default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

impl Monitor for NoopMonitor {
	fn record_request(&self, _breaker: &str, _event: Event, _latency: f64) {}
}
