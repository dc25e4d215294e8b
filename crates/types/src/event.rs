//! Request outcome classifications shared by breaker, wire protocol and
//! telemetry sink.

use std::fmt;
use std::str::FromStr;

/// Outcome of one guarded call, as recorded against a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
	Success,
	Failure,
	Timeout,
	/// Rejected by the breaker without executing the call. Observable in
	/// metrics but excluded from the admission totals.
	ShortCircuited,
}

/// Raised for a RECORD command naming an event outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event '{0}'")]
pub struct UnknownEventError(pub String);

impl Event {
	/// Wire name used in RECORD commands, METRICS fields and telemetry.
	pub fn as_str(&self) -> &'static str {
		match self {
			Event::Success => "success",
			Event::Failure => "failure",
			Event::Timeout => "timeout",
			Event::ShortCircuited => "short_circuited",
		}
	}
}

impl FromStr for Event {
	type Err = UnknownEventError;

	/// Case-insensitive, matching the server's RECORD handling.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("success") {
			Ok(Event::Success)
		} else if s.eq_ignore_ascii_case("failure") {
			Ok(Event::Failure)
		} else if s.eq_ignore_ascii_case("timeout") {
			Ok(Event::Timeout)
		} else if s.eq_ignore_ascii_case("short_circuited") {
			Ok(Event::ShortCircuited)
		} else {
			Err(UnknownEventError(s.to_string()))
		}
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}
