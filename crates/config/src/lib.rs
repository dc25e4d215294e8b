//! Server configuration loaded from an optional file plus environment
//! overrides.

pub mod loader;
pub mod settings;

pub use loader::load_settings;
pub use settings::{LoggingSettings, MaintenanceSettings, ServerSettings, Settings};
