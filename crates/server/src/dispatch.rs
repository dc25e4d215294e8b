//! Command dispatch against the shared breaker panel.

use fusebox_engine::BreakerPanel;
use fusebox_proto::Value;
use fusebox_types::{
	BreakerOptions, Event, FIELD_LATENCY_BUCKETS, FIELD_LATENCY_COUNT, FIELD_LATENCY_SUM,
};
use tokio::sync::RwLock;
use tracing::debug;

/// Shared, concurrently maintained breaker panel.
pub type SharedPanel = std::sync::Arc<RwLock<BreakerPanel>>;

/// What to do with a connection after a command.
#[derive(Debug, PartialEq)]
pub enum Outcome {
	/// Send the reply and keep reading.
	Reply(Value),
	/// Send the reply, then close the connection.
	Close(Value),
}

fn err(message: impl Into<String>) -> Outcome {
	Outcome::Reply(Value::Error(message.into()))
}

fn arity_error(command: &str) -> Outcome {
	err(format!("ERR wrong number of arguments for '{command}'"))
}

/// Execute one request. Unknown commands and bad arguments produce an
/// error reply but leave the connection open; framing errors are the
/// connection handler's concern, not dispatch's.
pub async fn dispatch(panel: &SharedPanel, tokens: &[Vec<u8>]) -> Outcome {
	let Some(command) = tokens.first() else {
		return err("ERR empty command");
	};
	let command = String::from_utf8_lossy(command).to_ascii_uppercase();
	let args = &tokens[1..];

	match command.as_str() {
		"PING" => match args {
			[] => Outcome::Reply(Value::Simple("PONG".to_string())),
			// extra tokens are ignored, only the first is echoed
			[message, ..] => Outcome::Reply(Value::Bulk(message.clone())),
		},
		"QUIT" => Outcome::Close(Value::ok()),
		"INSTALL" => install(panel, args).await,
		"ALLOW_REQUEST" => match args {
			[name] => {
				let name = String::from_utf8_lossy(name);
				let allowed = panel.read().await.allow_request(&name);
				Outcome::Reply(Value::Int(i64::from(allowed)))
			}
			_ => arity_error("allow_request"),
		},
		"RECORD" => record(panel, args).await,
		"METRICS" => match args {
			[name] => {
				let name = String::from_utf8_lossy(name);
				let metrics = panel.read().await.metrics(&name);
				Outcome::Reply(metrics_reply(&metrics))
			}
			_ => arity_error("metrics"),
		},
		"BREAKERS" => match args {
			[] => {
				let names = panel
					.read()
					.await
					.names()
					.iter()
					.map(|name| Value::bulk(name.as_str()))
					.collect();
				Outcome::Reply(Value::Array(names))
			}
			_ => arity_error("breakers"),
		},
		other => err(format!("ERR unknown command '{other}'")),
	}
}

async fn install(panel: &SharedPanel, args: &[Vec<u8>]) -> Outcome {
	let Some((name, option_tokens)) = args.split_first() else {
		return arity_error("install");
	};
	let name = String::from_utf8_lossy(name);
	let mut options = BreakerOptions::default();
	// alternating key/value pairs; a trailing key without a value is
	// ignored
	for pair in option_tokens.chunks(2) {
		if let [key, value] = pair {
			options.set(&String::from_utf8_lossy(key), &String::from_utf8_lossy(value));
		}
	}
	panel.write().await.install(&name, options);
	Outcome::Reply(Value::ok())
}

async fn record(panel: &SharedPanel, args: &[Vec<u8>]) -> Outcome {
	let (name, event, latency) = match args {
		[name, event] => (name, event, 0.0),
		[name, event, latency] => {
			let latency_text = String::from_utf8_lossy(latency);
			match latency_text.parse::<f64>() {
				Ok(latency) => (name, event, latency),
				Err(_) => return err(format!("ERR invalid latency '{latency_text}'")),
			}
		}
		_ => return arity_error("record"),
	};
	let name = String::from_utf8_lossy(name);
	let event_text = String::from_utf8_lossy(event);
	let Ok(event) = event_text.parse::<Event>() else {
		return err(format!("ERR unknown event '{event_text}'"));
	};
	debug!(breaker = %name, event = %event, latency, "recording event");
	panel.write().await.record(&name, event, latency);
	Outcome::Reply(Value::ok())
}

/// Flattened field/value array. Counter fields carry integer values,
/// the latency sum is a stringified float, and the histogram is a
/// nested array of (upper bound, cumulative count) string pairs with
/// the unbounded top bucket rendered as "inf".
fn metrics_reply(metrics: &fusebox_types::BreakerMetrics) -> Value {
	let mut fields = Vec::with_capacity(14);
	for event in [Event::Success, Event::Failure, Event::Timeout, Event::ShortCircuited] {
		let count = match event {
			Event::Success => metrics.success,
			Event::Failure => metrics.failure,
			Event::Timeout => metrics.timeout,
			Event::ShortCircuited => metrics.short_circuited,
		};
		fields.push(Value::bulk(event.as_str()));
		fields.push(Value::Int(count as i64));
	}
	fields.push(Value::bulk(FIELD_LATENCY_SUM));
	fields.push(Value::bulk(metrics.latency_sum.to_string()));
	fields.push(Value::bulk(FIELD_LATENCY_COUNT));
	fields.push(Value::Int(metrics.latency_count as i64));
	fields.push(Value::bulk(FIELD_LATENCY_BUCKETS));
	fields.push(Value::Array(
		metrics
			.latency_buckets
			.iter()
			.map(|(bound, count)| {
				Value::Array(vec![
					Value::bulk(bound.to_string()),
					Value::bulk(count.to_string()),
				])
			})
			.collect(),
	));
	Value::Array(fields)
}
