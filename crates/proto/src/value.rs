//! RESP value tree with encode and incremental decode.

use bytes::{BufMut, BytesMut};

use crate::ProtoError;

/// One RESP value. Bulk strings are kept as raw bytes; everything else
/// carries its natural Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	/// `+OK\r\n`
	Simple(String),
	/// `-ERR ...\r\n`
	Error(String),
	/// `:42\r\n`
	Int(i64),
	/// `$5\r\nhello\r\n`
	Bulk(Vec<u8>),
	/// `$-1\r\n`
	Null,
	/// `*2\r\n...`
	Array(Vec<Value>),
}

impl Value {
	/// Bulk string from anything stringish.
	pub fn bulk(s: impl Into<Vec<u8>>) -> Self {
		Value::Bulk(s.into())
	}

	/// Simple-string `+OK`.
	pub fn ok() -> Self {
		Value::Simple("OK".to_string())
	}

	/// The bulk payload as UTF-8, when this is a bulk string.
	pub fn as_bulk_str(&self) -> Option<&str> {
		match self {
			Value::Bulk(bytes) => std::str::from_utf8(bytes).ok(),
			_ => None,
		}
	}
}

/// Append the wire form of `value` to `buf`.
pub fn encode(value: &Value, buf: &mut BytesMut) {
	match value {
		Value::Simple(s) => {
			buf.put_u8(b'+');
			buf.put_slice(s.as_bytes());
			buf.put_slice(b"\r\n");
		}
		Value::Error(s) => {
			buf.put_u8(b'-');
			buf.put_slice(s.as_bytes());
			buf.put_slice(b"\r\n");
		}
		Value::Int(n) => {
			buf.put_u8(b':');
			buf.put_slice(n.to_string().as_bytes());
			buf.put_slice(b"\r\n");
		}
		Value::Bulk(bytes) => {
			buf.put_u8(b'$');
			buf.put_slice(bytes.len().to_string().as_bytes());
			buf.put_slice(b"\r\n");
			buf.put_slice(bytes);
			buf.put_slice(b"\r\n");
		}
		Value::Null => {
			buf.put_slice(b"$-1\r\n");
		}
		Value::Array(items) => {
			buf.put_u8(b'*');
			buf.put_slice(items.len().to_string().as_bytes());
			buf.put_slice(b"\r\n");
			for item in items {
				encode(item, buf);
			}
		}
	}
}

/// Deepest accepted array nesting. The protocol only ever needs flat
/// token arrays plus the two-level metrics reply.
const MAX_ARRAY_DEPTH: usize = 8;

/// Decode one value from the front of `buf`.
///
/// Returns the value and the number of bytes it occupied, or `None`
/// when the buffer holds only a prefix of a frame.
pub fn decode(buf: &[u8]) -> Result<Option<(Value, usize)>, ProtoError> {
	decode_at(buf, 0)
}

fn decode_at(buf: &[u8], depth: usize) -> Result<Option<(Value, usize)>, ProtoError> {
	let Some((&type_byte, rest)) = buf.split_first() else {
		return Ok(None);
	};
	match type_byte {
		b'+' => Ok(line(rest)?.map(|(text, used)| (Value::Simple(text), 1 + used))),
		b'-' => Ok(line(rest)?.map(|(text, used)| (Value::Error(text), 1 + used))),
		b':' => match line(rest)? {
			Some((text, used)) => {
				let n = text.parse().map_err(|_| ProtoError::BadInteger)?;
				Ok(Some((Value::Int(n), 1 + used)))
			}
			None => Ok(None),
		},
		b'$' => decode_bulk(rest),
		b'*' => decode_array(rest, depth),
		other => Err(ProtoError::InvalidType(other)),
	}
}

fn decode_bulk(rest: &[u8]) -> Result<Option<(Value, usize)>, ProtoError> {
	let Some((header, header_len)) = line(rest)? else {
		return Ok(None);
	};
	let len: i64 = header.parse().map_err(|_| ProtoError::BadLength)?;
	if len == -1 {
		return Ok(Some((Value::Null, 1 + header_len)));
	}
	let len = usize::try_from(len).map_err(|_| ProtoError::BadLength)?;
	let payload = &rest[header_len..];
	if payload.len() < len + 2 {
		return Ok(None);
	}
	if &payload[len..len + 2] != b"\r\n" {
		return Err(ProtoError::BadLength);
	}
	let value = Value::Bulk(payload[..len].to_vec());
	Ok(Some((value, 1 + header_len + len + 2)))
}

fn decode_array(rest: &[u8], depth: usize) -> Result<Option<(Value, usize)>, ProtoError> {
	// bounded recursion; untrusted input must not exhaust the stack
	if depth >= MAX_ARRAY_DEPTH {
		return Err(ProtoError::NestingTooDeep);
	}
	let Some((header, header_len)) = line(rest)? else {
		return Ok(None);
	};
	let count: i64 = header.parse().map_err(|_| ProtoError::BadLength)?;
	if count == -1 {
		return Ok(Some((Value::Null, 1 + header_len)));
	}
	let count = usize::try_from(count).map_err(|_| ProtoError::BadLength)?;
	let mut used = 1 + header_len;
	let mut items = Vec::with_capacity(count);
	for _ in 0..count {
		match decode_at(&rest[used - 1..], depth + 1)? {
			Some((item, item_len)) => {
				items.push(item);
				used += item_len;
			}
			None => return Ok(None),
		}
	}
	Ok(Some((Value::Array(items), used)))
}

/// One CRLF-terminated line as UTF-8, plus bytes consumed including the
/// terminator.
fn line(buf: &[u8]) -> Result<Option<(String, usize)>, ProtoError> {
	let Some(pos) = buf.windows(2).position(|w| w == b"\r\n") else {
		return Ok(None);
	};
	let text = String::from_utf8_lossy(&buf[..pos]).into_owned();
	Ok(Some((text, pos + 2)))
}
