//! End-to-end tests against a running breaker server.

mod common;

use std::time::Duration;

use fusebox::{BreakerOptions, Event, RespClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use common::{spawn_server, spawn_server_with};

fn tight_options() -> BreakerOptions {
	BreakerOptions {
		window_duration: Some(10),
		sleep_window_duration: Some(1),
		error_threshold: Some(0.5),
		request_volume_threshold: Some(2),
		..Default::default()
	}
}

#[tokio::test]
async fn ping_quit_and_reconnect() {
	let server = spawn_server().await;
	let client = RespClient::new(server.addr().to_string());

	client.ping().await.expect("ping should succeed");
	client.quit().await.expect("quit should succeed");
	// a fresh connection is dialed transparently
	client.ping().await.expect("ping after quit should succeed");

	server.shutdown();
}

#[tokio::test]
async fn trips_on_errors_and_probes_after_sleep_window() {
	let server = spawn_server().await;
	let client = RespClient::new(server.addr().to_string());

	client.install("payments", &tight_options()).await.unwrap();
	client.record("payments", Event::Failure, 0.2).await.unwrap();
	client.record("payments", Event::Failure, 0.2).await.unwrap();
	assert!(!client.allow_request("payments").await.unwrap());

	let metrics = client.metrics("payments").await.unwrap();
	assert_eq!(metrics.failure, 2);
	assert_eq!(metrics.latency_count, 2);
	assert!((metrics.latency_sum - 0.4).abs() < 1e-9);

	// sleep window (1s) elapses; errors are still inside the 10s window
	tokio::time::sleep(Duration::from_millis(2300)).await;
	assert!(client.allow_request("payments").await.unwrap());
	assert_eq!(client.metrics("payments").await.unwrap().failure, 2);

	server.shutdown();
}

#[tokio::test]
async fn window_eviction_recloses_the_circuit() {
	let server = spawn_server().await;
	let client = RespClient::new(server.addr().to_string());

	// short window, long sleep: recovery can only come from eviction
	let options = BreakerOptions {
		window_duration: Some(2),
		sleep_window_duration: Some(60),
		error_threshold: Some(0.5),
		request_volume_threshold: Some(2),
		..Default::default()
	};
	client.install("inventory", &options).await.unwrap();
	client.record("inventory", Event::Timeout, 1.0).await.unwrap();
	client.record("inventory", Event::Timeout, 1.0).await.unwrap();
	assert!(!client.allow_request("inventory").await.unwrap());

	tokio::time::sleep(Duration::from_millis(2500)).await;
	assert!(client.allow_request("inventory").await.unwrap());
	let metrics = client.metrics("inventory").await.unwrap();
	assert_eq!(metrics.timeout, 0);
	// histogram is cumulative and never evicts
	assert_eq!(metrics.latency_count, 2);

	server.shutdown();
}

#[tokio::test]
async fn breakers_lists_installed_names_and_config_preinstalls() {
	let server = spawn_server_with(|settings| {
		settings
			.breakers
			.insert("from_config".to_string(), BreakerOptions::default());
	})
	.await;
	let client = RespClient::new(server.addr().to_string());

	client.install("alpha", &BreakerOptions::default()).await.unwrap();
	client.install("beta", &BreakerOptions::default()).await.unwrap();

	let names = client.breakers().await.unwrap();
	assert_eq!(names.first().map(String::as_str), Some("from_config"));
	assert_eq!(&names[1..], ["alpha", "beta"]);

	server.shutdown();
}

#[tokio::test]
async fn uninstalled_names_share_one_default_breaker() {
	let server = spawn_server().await;
	let client = RespClient::new(server.addr().to_string());

	client.record("ghost", Event::Failure, 0.1).await.unwrap();
	// a different never-installed name sees the same counters
	assert_eq!(client.metrics("phantom").await.unwrap().failure, 1);
	assert!(client.breakers().await.unwrap().is_empty());

	server.shutdown();
}

#[tokio::test]
async fn inline_commands_share_the_connection() {
	let server = spawn_server().await;
	let mut stream = TcpStream::connect(server.addr()).await.unwrap();

	stream.write_all(b"PING hello\r\n").await.unwrap();
	assert_eq!(read_reply(&mut stream).await, b"$5\r\nhello\r\n");

	// unknown command replies with an error but keeps the connection
	stream.write_all(b"EXPLODE\r\n").await.unwrap();
	assert_eq!(read_reply(&mut stream).await, b"-ERR unknown command 'EXPLODE'\r\n");

	// blank lines are skipped, bare LF works
	stream.write_all(b"\r\nPING\n").await.unwrap();
	assert_eq!(read_reply(&mut stream).await, b"+PONG\r\n");

	server.shutdown();
}

#[tokio::test]
async fn malformed_frame_closes_the_connection() {
	let server = spawn_server().await;
	let mut stream = TcpStream::connect(server.addr()).await.unwrap();

	stream.write_all(b"*1\r\n@5\r\n").await.unwrap();
	let mut buf = [0u8; 64];
	let n = stream.read(&mut buf).await.unwrap();
	assert_eq!(n, 0, "server should close without replying");

	server.shutdown();
}

#[tokio::test]
async fn record_rejects_unknown_event_and_counts_nothing() {
	let server = spawn_server().await;
	let mut stream = TcpStream::connect(server.addr()).await.unwrap();

	stream.write_all(b"RECORD svc explosion 0.1\r\n").await.unwrap();
	assert_eq!(read_reply(&mut stream).await, b"-ERR unknown event 'explosion'\r\n");

	stream.write_all(b"METRICS svc\r\n").await.unwrap();
	let reply = String::from_utf8(read_reply(&mut stream).await).unwrap();
	assert!(reply.starts_with("*14\r\n$7\r\nsuccess\r\n:0\r\n"));

	server.shutdown();
}

/// Read until the stream pauses; replies here are small and arrive in
/// one burst.
async fn read_reply(stream: &mut TcpStream) -> Vec<u8> {
	let mut buf = [0u8; 4096];
	let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
		.await
		.expect("reply should arrive")
		.expect("read should succeed");
	buf[..n].to_vec()
}
