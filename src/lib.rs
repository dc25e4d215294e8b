//! Fusebox: a centralized circuit breaker service and client.
//!
//! The server keeps named sliding-window breakers behind a
//! RESP-compatible TCP protocol; applications guard calls with a
//! [`LocalBreaker`] (in-process state) or a [`RemoteBreaker`] (state
//! shared through the server, failing open when it is unreachable).

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use fusebox_client::{
	BreakerProxy, BreakerTransport, CircuitError, Classify, ClientError, LocalBreaker, Monitor,
	NoopMonitor, ProxyOptions, RemoteBreaker, RespClient,
};
pub use fusebox_config::{load_settings, Settings};
pub use fusebox_engine::{Breaker, BreakerPanel};
pub use fusebox_proto::{ProtoError, Value};
pub use fusebox_server::SharedPanel;
pub use fusebox_types::{BreakerMetrics, BreakerOptions, BreakerSettings, Event};

/// Install the global tracing subscriber from the logging settings.
/// `RUST_LOG` wins over the configured level. Safe to call more than
/// once; later calls are no-ops.
pub fn init_tracing(settings: &Settings) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
	let builder = tracing_subscriber::fmt().with_env_filter(filter);
	let _ = if settings.logging.format == "json" {
		builder.json().try_init()
	} else {
		builder.try_init()
	};
}

/// Assembles and starts the breaker server.
pub struct ServerBuilder {
	settings: Settings,
}

impl ServerBuilder {
	/// Builder from layered configuration (file plus environment).
	pub fn from_env() -> Result<Self, config::ConfigError> {
		Ok(Self {
			settings: load_settings()?,
		})
	}

	pub fn with_settings(settings: Settings) -> Self {
		Self { settings }
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Bind the listener, pre-install configured breakers and spawn the
	/// accept loop plus the maintenance ticker. Installs the tracing
	/// subscriber if none is set yet.
	pub async fn start(self) -> io::Result<ServerHandle> {
		init_tracing(&self.settings);
		let now = Utc::now().timestamp();
		let mut panel = BreakerPanel::new(now);
		for (name, options) in &self.settings.breakers {
			panel.install(name, options.clone());
		}
		let panel: SharedPanel = Arc::new(RwLock::new(panel));

		let listener = TcpListener::bind(self.settings.bind_address()).await?;
		let addr = listener.local_addr()?;
		info!(%addr, breakers = self.settings.breakers.len(), "starting breaker server");

		let maintenance = fusebox_server::spawn_maintenance(
			panel.clone(),
			Duration::from_millis(self.settings.maintenance.interval_ms),
		);
		let server = tokio::spawn(fusebox_server::serve(listener, panel.clone()));

		Ok(ServerHandle {
			addr,
			panel,
			server,
			maintenance,
		})
	}
}

/// Running server: bound address plus the spawned tasks.
pub struct ServerHandle {
	addr: SocketAddr,
	panel: SharedPanel,
	server: JoinHandle<io::Result<()>>,
	maintenance: JoinHandle<()>,
}

impl ServerHandle {
	pub fn addr(&self) -> SocketAddr {
		self.addr
	}

	/// Shared panel, mainly for inspection in tests.
	pub fn panel(&self) -> &SharedPanel {
		&self.panel
	}

	/// Block until the accept loop exits.
	pub async fn wait(self) -> io::Result<()> {
		match self.server.await {
			Ok(result) => result,
			Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
		}
	}

	/// Stop both background tasks.
	pub fn shutdown(&self) {
		self.server.abort();
		self.maintenance.abort();
	}
}
