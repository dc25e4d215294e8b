//! Single-breaker sliding window and admission decision.

use fusebox_types::{Bucket, BreakerMetrics, BreakerOptions, BreakerSettings, Event, Histogram};

/// One circuit breaker: a current one-second bucket, a window of rotated
/// historical buckets, rolling aggregates over the whole window and a
/// latency histogram.
///
/// There is no explicit open/closed state. Every admission decision is
/// recomputed from the live window, so the circuit re-closes on its own
/// as soon as failing buckets slide out.
#[derive(Debug, Clone)]
pub struct Breaker {
	options: BreakerOptions,
	settings: BreakerSettings,
	/// Counters for the bucket at `timestamp()`.
	bucket: Bucket,
	/// Rotated-out buckets still inside the window, oldest first.
	buckets: Vec<Bucket>,
	rolling_success: u64,
	rolling_failure: u64,
	rolling_timeout: u64,
	rolling_short_circuited: u64,
	/// Bucket timestamp of the most recent failure or timeout. Drives
	/// the sleep-window probe while the window still looks unhealthy.
	last_error_at: i64,
	latency: Histogram,
}

impl Breaker {
	/// Breaker with default settings, starting at the given epoch second.
	pub fn new(now: i64) -> Self {
		Self::with_options(BreakerOptions::default(), now)
	}

	pub fn with_options(options: BreakerOptions, now: i64) -> Self {
		let settings = options.settings();
		Self {
			options,
			settings,
			bucket: Bucket::new(now),
			buckets: Vec::new(),
			rolling_success: 0,
			rolling_failure: 0,
			rolling_timeout: 0,
			rolling_short_circuited: 0,
			last_error_at: 0,
			latency: Histogram::default(),
		}
	}

	pub fn options(&self) -> &BreakerOptions {
		&self.options
	}

	pub fn settings(&self) -> &BreakerSettings {
		&self.settings
	}

	/// Epoch second of the current bucket.
	pub fn timestamp(&self) -> i64 {
		self.bucket.timestamp
	}

	/// Failures plus timeouts across the window.
	pub fn error_count(&self) -> u64 {
		self.rolling_failure + self.rolling_timeout
	}

	/// Admitted requests across the window. Short-circuited calls never
	/// executed, so they are excluded.
	pub fn request_count(&self) -> u64 {
		self.rolling_success + self.error_count()
	}

	/// Decide whether the next call may proceed.
	///
	/// The checks run in order: a healthy error ratio admits outright, a
	/// window below the volume threshold admits regardless of ratio, and
	/// an unhealthy window admits a probe once the sleep window has
	/// elapsed since the last error. A window with zero requests has no
	/// meaningful ratio and is treated as healthy.
	pub fn allow_request(&self) -> bool {
		let requests = self.request_count();
		let ratio_exceeded = requests > 0
			&& self.error_count() as f64 / requests as f64 >= self.settings.error_threshold;
		if !ratio_exceeded {
			return true;
		}
		if requests < self.settings.request_volume_threshold {
			return true;
		}
		self.bucket.timestamp - self.last_error_at >= self.settings.sleep_window_duration
	}

	/// Advance the window to epoch second `t`.
	///
	/// Backwards or same-second calls are no-ops, so an already-current
	/// breaker can be slid redundantly. A gap of any length collapses in
	/// one call: the current bucket rotates into history, buckets older
	/// than the window are dropped and the rolling aggregates are
	/// recomputed from what remains.
	pub fn slide(&mut self, t: i64) {
		if t <= self.bucket.timestamp {
			return;
		}
		let rotated = std::mem::replace(&mut self.bucket, Bucket::new(t));
		self.buckets.push(rotated);
		let window_start = t - self.settings.window_duration + 1;
		self.buckets.retain(|b| b.timestamp >= window_start);

		self.rolling_success = self.buckets.iter().map(|b| b.success).sum();
		self.rolling_failure = self.buckets.iter().map(|b| b.failure).sum();
		self.rolling_timeout = self.buckets.iter().map(|b| b.timeout).sum();
		self.rolling_short_circuited = self.buckets.iter().map(|b| b.short_circuited).sum();
	}

	pub fn record_success(&mut self, latency: f64) {
		self.bucket.hit_success();
		self.rolling_success += 1;
		self.latency.observe(latency);
	}

	pub fn record_failure(&mut self, latency: f64) {
		self.bucket.hit_failure();
		self.rolling_failure += 1;
		self.last_error_at = self.bucket.timestamp;
		self.latency.observe(latency);
	}

	pub fn record_timeout(&mut self, latency: f64) {
		self.bucket.hit_timeout();
		self.rolling_timeout += 1;
		self.last_error_at = self.bucket.timestamp;
		self.latency.observe(latency);
	}

	/// Rejections are counted for observability only. They stay out of
	/// the histogram and out of the admission totals.
	pub fn record_short_circuited(&mut self) {
		self.bucket.hit_short_circuited();
		self.rolling_short_circuited += 1;
	}

	pub fn record(&mut self, event: Event, latency: f64) {
		match event {
			Event::Success => self.record_success(latency),
			Event::Failure => self.record_failure(latency),
			Event::Timeout => self.record_timeout(latency),
			Event::ShortCircuited => self.record_short_circuited(),
		}
	}

	/// Snapshot the rolling counters and latency distribution.
	pub fn metrics(&self) -> BreakerMetrics {
		BreakerMetrics {
			success: self.rolling_success,
			failure: self.rolling_failure,
			timeout: self.rolling_timeout,
			short_circuited: self.rolling_short_circuited,
			latency_count: self.latency.observations(),
			latency_sum: self.latency.sum(),
			latency_buckets: self
				.latency
				.upper_bounds()
				.iter()
				.copied()
				.zip(self.latency.cumulative_counts().iter().copied())
				.collect(),
		}
	}
}
