//! Connection accept loop and background window maintenance.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use chrono::Utc;
use fusebox_proto::{encode, RequestParser};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{dispatch, Outcome, SharedPanel};

/// Accept connections forever, one task per client.
pub async fn serve(listener: TcpListener, panel: SharedPanel) -> io::Result<()> {
	let addr = listener.local_addr()?;
	info!(%addr, "breaker server listening");
	loop {
		let (stream, peer) = listener.accept().await?;
		let panel = panel.clone();
		tokio::spawn(async move {
			debug!(%peer, "client connected");
			if let Err(e) = handle_connection(stream, &panel).await {
				debug!(%peer, error = %e, "connection ended with error");
			}
			debug!(%peer, "client disconnected");
		});
	}
}

async fn handle_connection(mut stream: TcpStream, panel: &SharedPanel) -> io::Result<()> {
	let mut parser = RequestParser::new();
	let mut read_buf = [0u8; 4096];
	let mut write_buf = BytesMut::new();

	loop {
		let n = stream.read(&mut read_buf).await?;
		if n == 0 {
			return Ok(());
		}
		parser.feed(&read_buf[..n]);

		loop {
			match parser.next_request() {
				Ok(Some(tokens)) => {
					// inline blank lines parse as empty requests
					if tokens.is_empty() {
						continue;
					}
					write_buf.clear();
					match dispatch(panel, &tokens).await {
						Outcome::Reply(reply) => {
							encode(&reply, &mut write_buf);
							stream.write_all(&write_buf).await?;
						}
						Outcome::Close(reply) => {
							encode(&reply, &mut write_buf);
							stream.write_all(&write_buf).await?;
							return Ok(());
						}
					}
				}
				Ok(None) => break,
				Err(e) => {
					// corrupt framing cannot be resynchronized
					error!(error = %e, "protocol error, closing connection");
					return Ok(());
				}
			}
		}
	}
}

/// Slide every breaker window once per `interval`, using the wall
/// clock's epoch second.
pub fn spawn_maintenance(panel: SharedPanel, interval: Duration) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			ticker.tick().await;
			let now = Utc::now().timestamp();
			panel.write().await.maintain(now);
		}
	})
}
