//! One second's worth of event counters.

use serde::{Deserialize, Serialize};

/// Event tally for a single epoch second.
///
/// A breaker keeps one current bucket plus a window of rotated-out
/// historical buckets. The timestamp never changes after construction;
/// counters only grow while the bucket is current.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bucket {
	/// Epoch-second timestamp this bucket covers
	pub timestamp: i64,
	/// Calls that completed within the request timeout
	pub success: u64,
	/// Calls that raised a non-tolerable error
	pub failure: u64,
	/// Calls that completed but exceeded the request timeout
	pub timeout: u64,
	/// Calls rejected without being executed
	pub short_circuited: u64,
}

impl Bucket {
	/// Create an empty bucket for the given epoch second.
	pub fn new(timestamp: i64) -> Self {
		Self {
			timestamp,
			success: 0,
			failure: 0,
			timeout: 0,
			short_circuited: 0,
		}
	}

	/// Failures plus timeouts; the numerator of the error ratio.
	pub fn error(&self) -> u64 {
		self.failure + self.timeout
	}

	pub fn hit_success(&mut self) {
		self.success += 1;
	}

	pub fn hit_failure(&mut self) {
		self.failure += 1;
	}

	pub fn hit_timeout(&mut self) {
		self.timeout += 1;
	}

	pub fn hit_short_circuited(&mut self) {
		self.short_circuited += 1;
	}
}
