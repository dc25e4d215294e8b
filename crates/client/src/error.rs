use fusebox_proto::ProtoError;
use thiserror::Error;

/// Failure talking to the breaker server.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("breaker server i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("breaker server call timed out")]
	Timeout,

	#[error(transparent)]
	Proto(#[from] ProtoError),

	#[error("breaker server error: {0}")]
	Server(String),

	#[error("unexpected reply from breaker server")]
	UnexpectedReply,
}

/// Error surfaced by a guarded call.
///
/// `Inner` is the protected operation's own error, passed through
/// untouched; the other variants are added by the breaker itself.
#[derive(Debug, Error)]
pub enum CircuitError<E: std::error::Error> {
	#[error("circuit '{0}' is open")]
	ShortCircuited(String),

	#[error(transparent)]
	Inner(#[from] E),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Error)]
	#[error("downstream unavailable")]
	struct Downstream;

	#[test]
	fn inner_error_display_is_transparent() {
		let err: CircuitError<Downstream> = Downstream.into();
		assert_eq!(err.to_string(), "downstream unavailable");
	}

	#[test]
	fn short_circuit_names_the_breaker() {
		let err: CircuitError<Downstream> = CircuitError::ShortCircuited("payments".into());
		assert_eq!(err.to_string(), "circuit 'payments' is open");
	}
}
