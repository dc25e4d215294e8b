//! Point-in-time breaker snapshot returned by metrics queries.

use serde::{Deserialize, Serialize};

/// METRICS reply field for the histogram's running sum.
pub const FIELD_LATENCY_SUM: &str = "latency_sum";
/// METRICS reply field for the histogram's observation count.
pub const FIELD_LATENCY_COUNT: &str = "latency_count";
/// METRICS reply field for the nested (bound, count) pair array.
pub const FIELD_LATENCY_BUCKETS: &str = "latency_buckets";

/// Immutable snapshot of a breaker's rolling counters and latency
/// distribution. Regenerated on every query; the all-zero `Default` is
/// the remote proxy's fallback when the breaker service is unreachable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakerMetrics {
	pub success: u64,
	pub failure: u64,
	pub timeout: u64,
	pub short_circuited: u64,
	pub latency_count: u64,
	pub latency_sum: f64,
	/// Cumulative count per upper bound, ascending; the last bound is
	/// +infinity.
	pub latency_buckets: Vec<(f64, u64)>,
}

impl BreakerMetrics {
	/// Failures plus timeouts.
	pub fn error(&self) -> u64 {
		self.failure + self.timeout
	}

	/// Total admitted requests. Short-circuited calls are excluded, the
	/// same way the admission algorithm excludes them.
	pub fn requests(&self) -> u64 {
		self.success + self.error()
	}
}
