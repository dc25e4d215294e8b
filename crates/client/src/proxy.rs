//! Breaker proxies guarding calls to protected dependencies.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use fusebox_engine::Breaker;
use fusebox_types::{BreakerMetrics, BreakerOptions, Event};
use tracing::{info, warn};

use crate::{CircuitError, Monitor, NoopMonitor, RespClient};

/// Classification of a protected operation's error, matched against the
/// proxy's tolerable set.
pub trait Classify {
	fn classification(&self) -> &str;
}

/// Where a proxy keeps its breaker state.
#[async_trait]
pub trait BreakerTransport: Send {
	async fn allow_request(&mut self) -> bool;
	async fn record(&mut self, event: Event, latency: f64);
	async fn metrics(&mut self) -> BreakerMetrics;
}

/// In-process breaker, slid against the wall clock on every touch.
pub struct LocalTransport {
	breaker: Breaker,
}

impl LocalTransport {
	pub fn new(options: BreakerOptions) -> Self {
		Self {
			breaker: Breaker::with_options(options, Utc::now().timestamp()),
		}
	}
}

#[async_trait]
impl BreakerTransport for LocalTransport {
	async fn allow_request(&mut self) -> bool {
		self.breaker.slide(Utc::now().timestamp());
		self.breaker.allow_request()
	}

	async fn record(&mut self, event: Event, latency: f64) {
		self.breaker.slide(Utc::now().timestamp());
		self.breaker.record(event, latency);
	}

	async fn metrics(&mut self) -> BreakerMetrics {
		self.breaker.metrics()
	}
}

/// Breaker state held by the shared server. Every operation fails open:
/// when the server is unreachable, requests are admitted, records are
/// dropped and metrics come back zeroed.
pub struct RemoteTransport {
	name: String,
	client: Arc<RespClient>,
}

impl RemoteTransport {
	pub fn new(name: impl Into<String>, client: Arc<RespClient>) -> Self {
		Self {
			name: name.into(),
			client,
		}
	}
}

#[async_trait]
impl BreakerTransport for RemoteTransport {
	async fn allow_request(&mut self) -> bool {
		match self.client.allow_request(&self.name).await {
			Ok(allowed) => allowed,
			Err(e) => {
				warn!(breaker = %self.name, error = %e, "breaker server unreachable, admitting request");
				true
			}
		}
	}

	async fn record(&mut self, event: Event, latency: f64) {
		if let Err(e) = self.client.record(&self.name, event, latency).await {
			warn!(breaker = %self.name, error = %e, "breaker server unreachable, dropping record");
		}
	}

	async fn metrics(&mut self) -> BreakerMetrics {
		match self.client.metrics(&self.name).await {
			Ok(metrics) => metrics,
			Err(e) => {
				warn!(breaker = %self.name, error = %e, "breaker server unreachable, returning empty metrics");
				BreakerMetrics::default()
			}
		}
	}
}

/// Proxy construction options.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
	/// Guarded call deadline in seconds.
	pub request_timeout: f64,
	/// Error classifications that settle as success before the error is
	/// passed back to the caller.
	pub tolerable_errors: Vec<String>,
	/// Fraction of settled calls forwarded to the monitor.
	pub monitor_sampling_fraction: f64,
	pub breaker: BreakerOptions,
}

impl Default for ProxyOptions {
	fn default() -> Self {
		Self {
			request_timeout: 1.0,
			tolerable_errors: Vec::new(),
			monitor_sampling_fraction: 1.0,
			breaker: BreakerOptions::default(),
		}
	}
}

pub type LocalBreaker = BreakerProxy<LocalTransport>;
pub type RemoteBreaker = BreakerProxy<RemoteTransport>;

/// Guards calls to one protected dependency.
///
/// Admission is asked of the transport before every call; a refusal
/// records a short-circuit and returns without executing the call. The
/// executed call runs to completion, is timed, and is then
/// settled as success, failure or timeout. Open/close transitions are
/// logged once per edge, not per call.
pub struct BreakerProxy<T: BreakerTransport> {
	name: String,
	transport: T,
	request_timeout: Duration,
	tolerable_errors: HashSet<String>,
	sampling_fraction: f64,
	monitor: Arc<dyn Monitor>,
	open: bool,
}

impl LocalBreaker {
	pub fn local(name: impl Into<String>, options: ProxyOptions) -> Self {
		let transport = LocalTransport::new(options.breaker.clone());
		Self::with_transport(name, transport, options)
	}
}

impl RemoteBreaker {
	/// Remote proxy against the shared server. Installation is
	/// best-effort; an unreachable server still yields a working,
	/// fail-open proxy.
	pub async fn remote(
		name: impl Into<String>,
		client: Arc<RespClient>,
		options: ProxyOptions,
	) -> Self {
		let name = name.into();
		if let Err(e) = client.install(&name, &options.breaker).await {
			warn!(breaker = %name, error = %e, "breaker install failed, continuing fail-open");
		}
		let transport = RemoteTransport::new(name.clone(), client);
		Self::with_transport(name, transport, options)
	}
}

impl<T: BreakerTransport> BreakerProxy<T> {
	pub fn with_transport(name: impl Into<String>, transport: T, options: ProxyOptions) -> Self {
		Self {
			name: name.into(),
			transport,
			request_timeout: Duration::from_secs_f64(options.request_timeout),
			tolerable_errors: options.tolerable_errors.into_iter().collect(),
			sampling_fraction: options.monitor_sampling_fraction,
			monitor: Arc::new(NoopMonitor),
			open: false,
		}
	}

	pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
		self.monitor = monitor;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Run `work` under the breaker.
	pub async fn request<F, Fut, V, E>(&mut self, work: F) -> Result<V, CircuitError<E>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<V, E>>,
		E: std::error::Error + Classify,
	{
		if !self.transport.allow_request().await {
			if !self.open {
				warn!(breaker = %self.name, "circuit opened, short-circuiting requests");
				self.open = true;
			}
			self.settle(Event::ShortCircuited, 0.0).await;
			return Err(CircuitError::ShortCircuited(self.name.clone()));
		}
		if self.open {
			info!(breaker = %self.name, "circuit closed, admitting requests");
			self.open = false;
		}

		// the call is never cancelled; elapsed time is judged after the
		// fact
		let started = Instant::now();
		let outcome = work().await;
		let elapsed = started.elapsed();
		let latency = elapsed.as_secs_f64();
		match outcome {
			Ok(value) => {
				self.settle_completed(elapsed, latency).await;
				Ok(value)
			}
			Err(error) => {
				if self.tolerable_errors.contains(error.classification()) {
					// tolerated: healthy for the breaker, still an error
					// for the caller
					self.settle_completed(elapsed, latency).await;
				} else {
					self.settle(Event::Failure, latency).await;
				}
				Err(CircuitError::Inner(error))
			}
		}
	}

	/// A call that ran to completion settles as a timeout when it
	/// overran the deadline, otherwise as a success.
	async fn settle_completed(&mut self, elapsed: Duration, latency: f64) {
		if elapsed > self.request_timeout {
			self.settle(Event::Timeout, latency).await;
		} else {
			self.settle(Event::Success, latency).await;
		}
	}

	pub async fn metrics(&mut self) -> BreakerMetrics {
		self.transport.metrics().await
	}

	async fn settle(&mut self, event: Event, latency: f64) {
		self.transport.record(event, latency).await;
		self.sample(event, latency);
	}

	fn sample(&self, event: Event, latency: f64) {
		if self.sampling_fraction == 1.0 || rand::random::<f64>() < self.sampling_fraction {
			self.monitor.record_request(&self.name, event, latency);
		}
	}
}
