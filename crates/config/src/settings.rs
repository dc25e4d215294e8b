//! Typed settings tree. Every section has working defaults so a bare
//! process starts without any configuration at all.

use std::collections::HashMap;

use fusebox_types::BreakerOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
	#[serde(default)]
	pub server: ServerSettings,
	#[serde(default)]
	pub maintenance: MaintenanceSettings,
	#[serde(default)]
	pub logging: LoggingSettings,
	/// Breakers installed at startup, before any client connects.
	#[serde(default)]
	pub breakers: HashMap<String, BreakerOptions>,
}

impl Settings {
	pub fn bind_address(&self) -> String {
		format!("{}:{}", self.server.host, self.server.port)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceSettings {
	/// Window-slide tick interval in milliseconds.
	#[serde(default = "default_maintenance_interval_ms")]
	pub interval_ms: u64,
}

impl Default for MaintenanceSettings {
	fn default() -> Self {
		Self {
			interval_ms: default_maintenance_interval_ms(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
	#[serde(default = "default_log_level")]
	pub level: String,
	/// "pretty" or "json"
	#[serde(default = "default_log_format")]
	pub format: String,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: default_log_level(),
			format: default_log_format(),
		}
	}
}

fn default_host() -> String {
	"127.0.0.1".to_string()
}

fn default_port() -> u16 {
	7379
}

fn default_maintenance_interval_ms() -> u64 {
	1000
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_log_format() -> String {
	"pretty".to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_usable() {
		let settings = Settings::default();
		assert_eq!(settings.bind_address(), "127.0.0.1:7379");
		assert_eq!(settings.maintenance.interval_ms, 1000);
		assert_eq!(settings.logging.level, "info");
		assert!(settings.breakers.is_empty());
	}

	#[test]
	fn deserializes_partial_config() {
		let settings: Settings = serde_json::from_str(
			r#"{
				"server": { "port": 9000 },
				"breakers": {
					"payments": { "window_duration": 30, "error_threshold": 0.25 }
				}
			}"#,
		)
		.unwrap();

		assert_eq!(settings.bind_address(), "127.0.0.1:9000");
		let payments = &settings.breakers["payments"];
		assert_eq!(payments.window_duration, Some(30));
		assert_eq!(payments.error_threshold, Some(0.25));
		assert_eq!(payments.settings().request_volume_threshold, 30);
	}
}
