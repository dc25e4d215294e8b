//! Named breaker registry with a shared fallback breaker.

use std::collections::HashMap;

use fusebox_types::{BreakerMetrics, BreakerOptions, Event};
use tracing::{debug, trace};

use crate::Breaker;

/// Registry of breakers keyed by name.
///
/// Queries against a name that was never installed hit a single shared
/// default breaker, so unknown names still get admission control. The
/// panel remembers installation order for listing.
#[derive(Debug)]
pub struct BreakerPanel {
	breakers: HashMap<String, Breaker>,
	/// Installation order of `breakers` keys.
	order: Vec<String>,
	default_breaker: Breaker,
	/// Epoch second the panel was last maintained to.
	timestamp: i64,
}

impl BreakerPanel {
	pub fn new(now: i64) -> Self {
		Self {
			breakers: HashMap::new(),
			order: Vec::new(),
			default_breaker: Breaker::new(now),
			timestamp: now,
		}
	}

	/// Install a breaker under `name`. Installing an existing name keeps
	/// the running breaker and its counters untouched.
	pub fn install(&mut self, name: &str, options: BreakerOptions) {
		if self.breakers.contains_key(name) {
			trace!(breaker = name, "breaker already installed");
			return;
		}
		debug!(breaker = name, ?options, "installing breaker");
		self.breakers
			.insert(name.to_string(), Breaker::with_options(options, self.timestamp));
		self.order.push(name.to_string());
	}

	/// Installed breaker names in installation order.
	pub fn names(&self) -> &[String] {
		&self.order
	}

	pub fn breaker(&self, name: &str) -> &Breaker {
		self.breakers.get(name).unwrap_or(&self.default_breaker)
	}

	fn breaker_mut(&mut self, name: &str) -> &mut Breaker {
		self.breakers
			.get_mut(name)
			.unwrap_or(&mut self.default_breaker)
	}

	pub fn allow_request(&self, name: &str) -> bool {
		self.breaker(name).allow_request()
	}

	pub fn record(&mut self, name: &str, event: Event, latency: f64) {
		self.breaker_mut(name).record(event, latency);
	}

	pub fn metrics(&self, name: &str) -> BreakerMetrics {
		self.breaker(name).metrics()
	}

	/// Slide every breaker's window forward to epoch second `t`. Calls
	/// that do not advance the clock are no-ops.
	pub fn maintain(&mut self, t: i64) {
		if t <= self.timestamp {
			return;
		}
		trace!(from = self.timestamp, to = t, "maintaining breaker windows");
		self.timestamp = t;
		self.default_breaker.slide(t);
		for breaker in self.breakers.values_mut() {
			breaker.slide(t);
		}
	}
}
