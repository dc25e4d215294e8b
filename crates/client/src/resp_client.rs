//! RESP client for the breaker server.

use std::io;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use fusebox_proto::{decode, encode, Value};
use fusebox_types::{
	BreakerMetrics, BreakerOptions, Event, FIELD_LATENCY_BUCKETS, FIELD_LATENCY_COUNT,
	FIELD_LATENCY_SUM,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::ClientError;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(100);

struct Connection {
	stream: TcpStream,
	buf: BytesMut,
}

impl Connection {
	async fn open(addr: &str) -> Result<Self, ClientError> {
		let stream = TcpStream::connect(addr).await?;
		Ok(Self {
			stream,
			buf: BytesMut::new(),
		})
	}

	async fn exchange(&mut self, tokens: &[Vec<u8>]) -> Result<Value, ClientError> {
		let request = Value::Array(tokens.iter().map(|t| Value::Bulk(t.clone())).collect());
		let mut out = BytesMut::new();
		encode(&request, &mut out);
		self.stream.write_all(&out).await?;

		loop {
			if let Some((value, used)) = decode(&self.buf)? {
				self.buf.advance(used);
				return match value {
					Value::Error(message) => Err(ClientError::Server(message)),
					value => Ok(value),
				};
			}
			let mut chunk = [0u8; 4096];
			let n = self.stream.read(&mut chunk).await?;
			if n == 0 {
				return Err(ClientError::Io(io::Error::new(
					io::ErrorKind::UnexpectedEof,
					"breaker server closed the connection",
				)));
			}
			self.buf.extend_from_slice(&chunk[..n]);
		}
	}
}

/// One logical connection to the breaker server, reconnecting lazily.
///
/// Every call runs under a short timeout; any timeout or error drops
/// the connection so the next call starts from a fresh dial. Safe to
/// share behind an `Arc`, with calls serialized internally.
pub struct RespClient {
	addr: String,
	timeout: Duration,
	conn: Mutex<Option<Connection>>,
}

impl RespClient {
	pub fn new(addr: impl Into<String>) -> Self {
		Self::with_timeout(addr, DEFAULT_CALL_TIMEOUT)
	}

	pub fn with_timeout(addr: impl Into<String>, timeout: Duration) -> Self {
		Self {
			addr: addr.into(),
			timeout,
			conn: Mutex::new(None),
		}
	}

	pub fn addr(&self) -> &str {
		&self.addr
	}

	async fn call(&self, tokens: &[Vec<u8>]) -> Result<Value, ClientError> {
		let mut guard = self.conn.lock().await;
		let mut conn = match guard.take() {
			Some(conn) => conn,
			None => {
				match tokio::time::timeout(self.timeout, Connection::open(&self.addr)).await {
					Ok(Ok(conn)) => conn,
					Ok(Err(e)) => return Err(e),
					Err(_) => return Err(ClientError::Timeout),
				}
			}
		};
		match tokio::time::timeout(self.timeout, conn.exchange(tokens)).await {
			Ok(Ok(value)) => {
				// only a clean exchange keeps the connection
				*guard = Some(conn);
				Ok(value)
			}
			Ok(Err(e)) => Err(e),
			Err(_) => Err(ClientError::Timeout),
		}
	}

	pub async fn ping(&self) -> Result<(), ClientError> {
		match self.call(&tokens(&["PING"])).await? {
			Value::Simple(s) if s == "PONG" => Ok(()),
			_ => Err(ClientError::UnexpectedReply),
		}
	}

	pub async fn install(&self, name: &str, options: &BreakerOptions) -> Result<(), ClientError> {
		let mut request = tokens(&["INSTALL", name]);
		for (key, value) in options.wire_pairs() {
			request.push(key.into_bytes());
			request.push(value.into_bytes());
		}
		expect_ok(self.call(&request).await?)
	}

	pub async fn allow_request(&self, name: &str) -> Result<bool, ClientError> {
		match self.call(&tokens(&["ALLOW_REQUEST", name])).await? {
			Value::Int(n) => Ok(n != 0),
			_ => Err(ClientError::UnexpectedReply),
		}
	}

	pub async fn record(&self, name: &str, event: Event, latency: f64) -> Result<(), ClientError> {
		let request = tokens(&["RECORD", name, event.as_str(), &latency.to_string()]);
		expect_ok(self.call(&request).await?)
	}

	pub async fn record_success(&self, name: &str, latency: f64) -> Result<(), ClientError> {
		self.record(name, Event::Success, latency).await
	}

	pub async fn record_failure(&self, name: &str, latency: f64) -> Result<(), ClientError> {
		self.record(name, Event::Failure, latency).await
	}

	pub async fn record_timeout(&self, name: &str, latency: f64) -> Result<(), ClientError> {
		self.record(name, Event::Timeout, latency).await
	}

	pub async fn record_short_circuited(&self, name: &str) -> Result<(), ClientError> {
		self.record(name, Event::ShortCircuited, 0.0).await
	}

	pub async fn metrics(&self, name: &str) -> Result<BreakerMetrics, ClientError> {
		match self.call(&tokens(&["METRICS", name])).await? {
			Value::Array(fields) => parse_metrics(&fields),
			_ => Err(ClientError::UnexpectedReply),
		}
	}

	pub async fn breakers(&self) -> Result<Vec<String>, ClientError> {
		let Value::Array(items) = self.call(&tokens(&["BREAKERS"])).await? else {
			return Err(ClientError::UnexpectedReply);
		};
		items
			.iter()
			.map(|item| {
				item.as_bulk_str()
					.map(str::to_string)
					.ok_or(ClientError::UnexpectedReply)
			})
			.collect()
	}

	pub async fn quit(&self) -> Result<(), ClientError> {
		let result = expect_ok(self.call(&tokens(&["QUIT"])).await?);
		*self.conn.lock().await = None;
		result
	}
}

fn tokens(parts: &[&str]) -> Vec<Vec<u8>> {
	parts.iter().map(|p| p.as_bytes().to_vec()).collect()
}

fn expect_ok(value: Value) -> Result<(), ClientError> {
	match value {
		Value::Simple(s) if s == "OK" => Ok(()),
		_ => Err(ClientError::UnexpectedReply),
	}
}

fn parse_metrics(fields: &[Value]) -> Result<BreakerMetrics, ClientError> {
	let mut metrics = BreakerMetrics::default();
	for pair in fields.chunks(2) {
		let [field, value] = pair else {
			return Err(ClientError::UnexpectedReply);
		};
		let Some(field) = field.as_bulk_str() else {
			return Err(ClientError::UnexpectedReply);
		};
		match field {
			"success" => metrics.success = int_field(value)?,
			"failure" => metrics.failure = int_field(value)?,
			"timeout" => metrics.timeout = int_field(value)?,
			"short_circuited" => metrics.short_circuited = int_field(value)?,
			FIELD_LATENCY_COUNT => metrics.latency_count = int_field(value)?,
			FIELD_LATENCY_SUM => metrics.latency_sum = float_field(value)?,
			FIELD_LATENCY_BUCKETS => metrics.latency_buckets = bucket_field(value)?,
			// future server versions may add fields
			_ => {}
		}
	}
	Ok(metrics)
}

fn int_field(value: &Value) -> Result<u64, ClientError> {
	match value {
		Value::Int(n) => u64::try_from(*n).map_err(|_| ClientError::UnexpectedReply),
		_ => Err(ClientError::UnexpectedReply),
	}
}

/// Floats travel as bulk strings; the unbounded bound is "inf", which
/// Rust's float parser accepts natively.
fn float_field(value: &Value) -> Result<f64, ClientError> {
	value
		.as_bulk_str()
		.and_then(|s| s.parse().ok())
		.ok_or(ClientError::UnexpectedReply)
}

fn bucket_field(value: &Value) -> Result<Vec<(f64, u64)>, ClientError> {
	let Value::Array(pairs) = value else {
		return Err(ClientError::UnexpectedReply);
	};
	pairs
		.iter()
		.map(|pair| {
			let Value::Array(parts) = pair else {
				return Err(ClientError::UnexpectedReply);
			};
			let [bound, count] = parts.as_slice() else {
				return Err(ClientError::UnexpectedReply);
			};
			let bound = float_field(bound)?;
			let count = bound_count(count)?;
			Ok((bound, count))
		})
		.collect()
}

fn bound_count(value: &Value) -> Result<u64, ClientError> {
	value
		.as_bulk_str()
		.and_then(|s| s.parse().ok())
		.ok_or(ClientError::UnexpectedReply)
}
