//! Client-side circuit breaking.
//!
//! A [`BreakerProxy`] wraps calls to a protected dependency, consulting
//! either an in-process breaker ([`LocalBreaker`]) or the shared breaker
//! server over RESP ([`RemoteBreaker`]). The remote flavor fails open:
//! if the breaker server is unreachable, protected calls proceed.

pub mod error;
pub mod monitor;
pub mod proxy;
pub mod resp_client;

pub use error::{CircuitError, ClientError};
pub use monitor::{Monitor, NoopMonitor};
pub use proxy::{
	BreakerProxy, BreakerTransport, Classify, LocalBreaker, LocalTransport, ProxyOptions,
	RemoteBreaker, RemoteTransport,
};
pub use resp_client::RespClient;
