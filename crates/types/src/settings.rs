//! Breaker configuration: resolved settings and the partially-specified
//! options that arrive via INSTALL commands or the config file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fully resolved tuning knobs for one breaker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakerSettings {
	/// Sliding window length in seconds
	pub window_duration: i64,
	/// Cool-down before a half-open probe is allowed, in seconds
	pub sleep_window_duration: i64,
	/// Error-rate fraction at which the circuit trips
	pub error_threshold: f64,
	/// Minimum requests in the window before the ratio is trusted
	pub request_volume_threshold: u64,
}

impl Default for BreakerSettings {
	fn default() -> Self {
		Self {
			window_duration: 10,
			sleep_window_duration: 5,
			error_threshold: 0.5,
			request_volume_threshold: 10,
		}
	}
}

/// Options as supplied by a caller: every known key optional, unknown
/// keys retained verbatim rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BreakerOptions {
	pub window_duration: Option<i64>,
	pub sleep_window_duration: Option<i64>,
	pub error_threshold: Option<f64>,
	pub request_volume_threshold: Option<u64>,
	/// Keys outside the fixed set, stored as opaque strings.
	#[serde(flatten)]
	pub extra: HashMap<String, String>,
}

impl BreakerOptions {
	/// Resolve against defaults. The volume threshold defaults to the
	/// effective window duration.
	pub fn settings(&self) -> BreakerSettings {
		let defaults = BreakerSettings::default();
		let window_duration = self.window_duration.unwrap_or(defaults.window_duration);
		BreakerSettings {
			window_duration,
			sleep_window_duration: self
				.sleep_window_duration
				.unwrap_or(defaults.sleep_window_duration),
			error_threshold: self.error_threshold.unwrap_or(defaults.error_threshold),
			request_volume_threshold: self
				.request_volume_threshold
				.unwrap_or(window_duration.max(0) as u64),
		}
	}

	/// Apply one wire key/value pair. Keys from the fixed integer set
	/// parse as integers, `error_threshold` as a float; anything else is
	/// stored as an opaque string. Values that fail their typed parse are
	/// kept in `extra` so the install is never rejected.
	pub fn set(&mut self, key: &str, value: &str) {
		match key {
			"window_duration" => match value.parse() {
				Ok(v) => self.window_duration = Some(v),
				Err(_) => self.store_extra(key, value),
			},
			"sleep_window_duration" => match value.parse() {
				Ok(v) => self.sleep_window_duration = Some(v),
				Err(_) => self.store_extra(key, value),
			},
			"request_volume_threshold" => match value.parse() {
				Ok(v) => self.request_volume_threshold = Some(v),
				Err(_) => self.store_extra(key, value),
			},
			"error_threshold" => match value.parse() {
				Ok(v) => self.error_threshold = Some(v),
				Err(_) => self.store_extra(key, value),
			},
			_ => self.store_extra(key, value),
		}
	}

	fn store_extra(&mut self, key: &str, value: &str) {
		self.extra.insert(key.to_string(), value.to_string());
	}

	/// Alternating key/value tokens for an INSTALL command, known keys
	/// first, then the opaque extras.
	pub fn wire_pairs(&self) -> Vec<(String, String)> {
		let mut pairs = Vec::new();
		if let Some(v) = self.window_duration {
			pairs.push(("window_duration".to_string(), v.to_string()));
		}
		if let Some(v) = self.sleep_window_duration {
			pairs.push(("sleep_window_duration".to_string(), v.to_string()));
		}
		if let Some(v) = self.error_threshold {
			pairs.push(("error_threshold".to_string(), v.to_string()));
		}
		if let Some(v) = self.request_volume_threshold {
			pairs.push(("request_volume_threshold".to_string(), v.to_string()));
		}
		for (key, value) in &self.extra {
			pairs.push((key.clone(), value.clone()));
		}
		pairs
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let settings = BreakerSettings::default();
		assert_eq!(settings.window_duration, 10);
		assert_eq!(settings.sleep_window_duration, 5);
		assert_eq!(settings.error_threshold, 0.5);
		assert_eq!(settings.request_volume_threshold, 10);
	}

	#[test]
	fn volume_threshold_defaults_to_window_duration() {
		let mut options = BreakerOptions::default();
		options.window_duration = Some(30);
		assert_eq!(options.settings().request_volume_threshold, 30);
	}

	#[test]
	fn explicit_volume_threshold_wins() {
		let options = BreakerOptions {
			window_duration: Some(30),
			request_volume_threshold: Some(5),
			..Default::default()
		};
		assert_eq!(options.settings().request_volume_threshold, 5);
	}

	#[test]
	fn set_parses_typed_keys() {
		let mut options = BreakerOptions::default();
		options.set("window_duration", "20");
		options.set("sleep_window_duration", "3");
		options.set("error_threshold", "0.25");
		options.set("request_volume_threshold", "7");

		let settings = options.settings();
		assert_eq!(settings.window_duration, 20);
		assert_eq!(settings.sleep_window_duration, 3);
		assert_eq!(settings.error_threshold, 0.25);
		assert_eq!(settings.request_volume_threshold, 7);
	}

	#[test]
	fn unknown_keys_are_stored_not_rejected() {
		let mut options = BreakerOptions::default();
		options.set("owner", "payments-team");
		assert_eq!(options.extra.get("owner").map(String::as_str), Some("payments-team"));
		assert_eq!(options.settings(), BreakerSettings::default());
	}

	#[test]
	fn unparseable_typed_value_lands_in_extra() {
		let mut options = BreakerOptions::default();
		options.set("window_duration", "soon");
		assert!(options.window_duration.is_none());
		assert_eq!(options.extra.get("window_duration").map(String::as_str), Some("soon"));
	}

	#[test]
	fn wire_pairs_round_trip_through_set() {
		let mut options = BreakerOptions::default();
		options.set("window_duration", "15");
		options.set("error_threshold", "0.75");
		options.set("region", "eu-west-1");

		let mut rebuilt = BreakerOptions::default();
		for (key, value) in options.wire_pairs() {
			rebuilt.set(&key, &value);
		}
		assert_eq!(rebuilt, options);
	}
}
