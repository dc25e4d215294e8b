use thiserror::Error;

/// Framing or syntax error in a RESP stream. Any of these is fatal to
/// the connection that produced it; there is no way to resynchronize a
/// corrupt frame boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
	#[error("invalid type byte 0x{0:02x}")]
	InvalidType(u8),

	#[error("invalid length in frame header")]
	BadLength,

	#[error("invalid integer in frame")]
	BadInteger,

	#[error("unexpected element in multi-bulk request")]
	UnexpectedElement,

	#[error("frame nesting too deep")]
	NestingTooDeep,

	#[error("inline request line too long")]
	LineTooLong,
}
