//! Fixed-bucket cumulative latency distribution.

use serde::{Deserialize, Serialize};

/// Default latency bounds in seconds. The final unbounded bucket catches
/// every observation.
pub const DEFAULT_LATENCY_BOUNDS: [f64; 15] = [
	0.005,
	0.01,
	0.025,
	0.05,
	0.075,
	0.1,
	0.25,
	0.5,
	0.75,
	1.0,
	2.5,
	5.0,
	7.5,
	10.0,
	f64::INFINITY,
];

/// Cumulative histogram with Prometheus-style semantics:
/// `cumulative_counts[i]` is the number of observations less than or
/// equal to `upper_bounds[i]`, and the last bound is always +infinity so
/// the final count equals the total number of observations.
///
/// Append-only; there is no decay or removal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Histogram {
	upper_bounds: Vec<f64>,
	cumulative_counts: Vec<u64>,
	sum: f64,
}

impl Histogram {
	/// Create a histogram over ascending upper bounds. An unbounded top
	/// bucket is appended when the caller did not provide one.
	pub fn new(mut upper_bounds: Vec<f64>) -> Self {
		if upper_bounds.last().map_or(true, |b| b.is_finite()) {
			upper_bounds.push(f64::INFINITY);
		}
		let cumulative_counts = vec![0; upper_bounds.len()];
		Self {
			upper_bounds,
			cumulative_counts,
			sum: 0.0,
		}
	}

	/// Count `value` in every bucket whose bound admits it and add it to
	/// the running sum.
	pub fn observe(&mut self, value: f64) {
		for (i, bound) in self.upper_bounds.iter().enumerate() {
			if value <= *bound {
				self.cumulative_counts[i] += 1;
			}
		}
		self.sum += value;
	}

	/// Total number of observations; the count of the unbounded bucket.
	pub fn observations(&self) -> u64 {
		self.cumulative_counts.last().copied().unwrap_or(0)
	}

	pub fn sum(&self) -> f64 {
		self.sum
	}

	pub fn upper_bounds(&self) -> &[f64] {
		&self.upper_bounds
	}

	pub fn cumulative_counts(&self) -> &[u64] {
		&self.cumulative_counts
	}
}

impl Default for Histogram {
	fn default() -> Self {
		Self::new(DEFAULT_LATENCY_BOUNDS.to_vec())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn counts_are_cumulative() {
		let mut histogram = Histogram::new(vec![1.0, 5.0, 10.0]);
		histogram.observe(0.5);
		histogram.observe(3.0);
		histogram.observe(7.0);

		assert_eq!(histogram.cumulative_counts(), &[1, 2, 3, 3]);
		assert_eq!(histogram.observations(), 3);
		assert!((histogram.sum() - 10.5).abs() < f64::EPSILON);
	}

	#[test]
	fn appends_unbounded_top_bucket() {
		let histogram = Histogram::new(vec![1.0, 2.0]);
		assert_eq!(histogram.upper_bounds().len(), 3);
		assert!(histogram.upper_bounds().last().unwrap().is_infinite());
	}

	#[test]
	fn keeps_existing_unbounded_bucket() {
		let histogram = Histogram::new(vec![1.0, f64::INFINITY]);
		assert_eq!(histogram.upper_bounds().len(), 2);
	}

	#[test]
	fn every_observation_lands_in_top_bucket() {
		let mut histogram = Histogram::default();
		for value in [0.0001, 0.5, 9.9, 42.0, 1e9] {
			histogram.observe(value);
		}
		assert_eq!(histogram.observations(), 5);
	}

	#[test]
	fn counts_never_decrease_across_bounds() {
		let mut histogram = Histogram::default();
		for i in 0..100 {
			histogram.observe(f64::from(i) * 0.137);
		}
		let counts = histogram.cumulative_counts();
		for window in counts.windows(2) {
			assert!(window[0] <= window[1]);
		}
		assert_eq!(*counts.last().unwrap(), 100);
	}

	#[test]
	fn boundary_value_counts_in_its_bucket() {
		let mut histogram = Histogram::new(vec![1.0, 2.0]);
		histogram.observe(1.0);
		assert_eq!(histogram.cumulative_counts(), &[1, 1, 1]);
	}
}
