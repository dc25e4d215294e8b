//! Settings assembly from file and environment sources.

use config::{Config, ConfigError, Environment, File};
use tracing::debug;

use crate::Settings;

/// Load settings from `config/config.{toml,yaml,json}` when present,
/// with `FUSEBOX__`-prefixed environment variables layered on top
/// (for example `FUSEBOX__SERVER__PORT=9000`).
pub fn load_settings() -> Result<Settings, ConfigError> {
	let config = Config::builder()
		.add_source(File::with_name("config/config").required(false))
		.add_source(Environment::with_prefix("FUSEBOX").separator("__"))
		.build()?;

	let settings: Settings = config.try_deserialize()?;
	debug!(
		bind = %settings.bind_address(),
		preinstalled = settings.breakers.len(),
		"settings loaded"
	);
	Ok(settings)
}
