//! Incremental request framing with multi-bulk and inline modes.

use bytes::{Buf, BytesMut};

use crate::{decode, ProtoError, Value};

/// Longest accepted inline command line.
const MAX_INLINE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
	/// No bytes seen yet.
	Undecided,
	/// `*`-prefixed RESP arrays of bulk strings.
	MultiBulk,
	/// Whitespace-separated tokens, one command per line.
	Inline,
}

/// Splits a connection's byte stream into requests, each a list of
/// token byte strings.
///
/// The first byte the connection sends picks the framing for its whole
/// lifetime: `*` selects multi-bulk RESP, anything else selects inline
/// commands terminated by LF or CRLF.
#[derive(Debug)]
pub struct RequestParser {
	buf: BytesMut,
	mode: Mode,
}

impl RequestParser {
	pub fn new() -> Self {
		Self {
			buf: BytesMut::new(),
			mode: Mode::Undecided,
		}
	}

	/// Append bytes read from the connection.
	pub fn feed(&mut self, bytes: &[u8]) {
		self.buf.extend_from_slice(bytes);
	}

	/// Next complete request, if the buffer holds one.
	///
	/// An inline empty line parses as an empty token list; callers skip
	/// those. Errors are unrecoverable for this parser.
	pub fn next_request(&mut self) -> Result<Option<Vec<Vec<u8>>>, ProtoError> {
		if self.mode == Mode::Undecided {
			match self.buf.first() {
				Some(b'*') => self.mode = Mode::MultiBulk,
				Some(_) => self.mode = Mode::Inline,
				None => return Ok(None),
			}
		}
		match self.mode {
			Mode::MultiBulk => self.next_multi_bulk(),
			Mode::Inline => self.next_inline(),
			Mode::Undecided => Ok(None),
		}
	}

	fn next_multi_bulk(&mut self) -> Result<Option<Vec<Vec<u8>>>, ProtoError> {
		let Some((value, used)) = decode(&self.buf)? else {
			return Ok(None);
		};
		self.buf.advance(used);
		let Value::Array(items) = value else {
			return Err(ProtoError::UnexpectedElement);
		};
		let mut tokens = Vec::with_capacity(items.len());
		for item in items {
			let Value::Bulk(bytes) = item else {
				return Err(ProtoError::UnexpectedElement);
			};
			tokens.push(bytes);
		}
		Ok(Some(tokens))
	}

	fn next_inline(&mut self) -> Result<Option<Vec<Vec<u8>>>, ProtoError> {
		let Some(newline) = self.buf.iter().position(|&b| b == b'\n') else {
			// a client that never terminates its line must not grow the
			// buffer forever
			if self.buf.len() > MAX_INLINE_LEN {
				return Err(ProtoError::LineTooLong);
			}
			return Ok(None);
		};
		if newline > MAX_INLINE_LEN {
			return Err(ProtoError::LineTooLong);
		}
		let mut line = self.buf.split_to(newline + 1);
		line.truncate(newline);
		if line.last() == Some(&b'\r') {
			line.truncate(line.len() - 1);
		}
		let tokens = line[..]
			.split(|b| b.is_ascii_whitespace())
			.filter(|token| !token.is_empty())
			.map(<[u8]>::to_vec)
			.collect();
		Ok(Some(tokens))
	}
}

impl Default for RequestParser {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(strs: &[&str]) -> Vec<Vec<u8>> {
		strs.iter().map(|s| s.as_bytes().to_vec()).collect()
	}

	#[test]
	fn parses_multi_bulk_request() {
		let mut parser = RequestParser::new();
		parser.feed(b"*2\r\n$4\r\nPING\r\n$5\r\nhello\r\n");
		assert_eq!(parser.next_request().unwrap(), Some(tokens(&["PING", "hello"])));
		assert_eq!(parser.next_request().unwrap(), None);
	}

	#[test]
	fn assembles_multi_bulk_across_partial_feeds() {
		let mut parser = RequestParser::new();
		for chunk in [&b"*1\r\n$4"[..], b"\r\nPI", b"NG\r\n"] {
			parser.feed(chunk);
		}
		assert_eq!(parser.next_request().unwrap(), Some(tokens(&["PING"])));
	}

	#[test]
	fn parses_inline_with_crlf_and_bare_lf() {
		let mut parser = RequestParser::new();
		parser.feed(b"PING\r\nALLOW_REQUEST payments\n");
		assert_eq!(parser.next_request().unwrap(), Some(tokens(&["PING"])));
		assert_eq!(
			parser.next_request().unwrap(),
			Some(tokens(&["ALLOW_REQUEST", "payments"]))
		);
		assert_eq!(parser.next_request().unwrap(), None);
	}

	#[test]
	fn inline_collapses_repeated_whitespace() {
		let mut parser = RequestParser::new();
		parser.feed(b"  RECORD   payments\tsuccess  0.25 \r\n");
		assert_eq!(
			parser.next_request().unwrap(),
			Some(tokens(&["RECORD", "payments", "success", "0.25"]))
		);
	}

	#[test]
	fn inline_empty_line_yields_empty_token_list() {
		let mut parser = RequestParser::new();
		parser.feed(b"\r\nPING\r\n");
		assert_eq!(parser.next_request().unwrap(), Some(vec![]));
		assert_eq!(parser.next_request().unwrap(), Some(tokens(&["PING"])));
	}

	#[test]
	fn first_byte_latches_the_mode() {
		let mut parser = RequestParser::new();
		parser.feed(b"PING\r\n");
		assert_eq!(parser.next_request().unwrap(), Some(tokens(&["PING"])));
		// a later asterisk is just an inline token now
		parser.feed(b"*1\r\n");
		assert_eq!(parser.next_request().unwrap(), Some(tokens(&["*1"])));
	}

	#[test]
	fn multi_bulk_with_non_bulk_element_is_an_error() {
		let mut parser = RequestParser::new();
		parser.feed(b"*1\r\n:5\r\n");
		assert_eq!(parser.next_request(), Err(ProtoError::UnexpectedElement));
	}

	#[test]
	fn malformed_multi_bulk_frame_is_an_error() {
		let mut parser = RequestParser::new();
		parser.feed(b"*1\r\n@5\r\n");
		assert_eq!(parser.next_request(), Err(ProtoError::InvalidType(b'@')));
	}

	#[test]
	fn deeply_nested_array_headers_are_an_error() {
		let mut parser = RequestParser::new();
		for _ in 0..200_000 {
			parser.feed(b"*1\r\n");
		}
		assert_eq!(parser.next_request(), Err(ProtoError::NestingTooDeep));
	}

	#[test]
	fn endless_inline_line_is_an_error() {
		let mut parser = RequestParser::new();
		parser.feed(&[b'a'; 70 * 1024]);
		assert_eq!(parser.next_request(), Err(ProtoError::LineTooLong));
	}

	#[test]
	fn inline_line_just_under_the_cap_still_parses() {
		let mut parser = RequestParser::new();
		let mut line = vec![b'a'; 1024];
		line.extend_from_slice(b"\r\n");
		parser.feed(&line);
		assert_eq!(parser.next_request().unwrap(), Some(vec![vec![b'a'; 1024]]));
	}

	#[test]
	fn binary_safe_tokens_survive_multi_bulk() {
		let mut parser = RequestParser::new();
		parser.feed(b"*1\r\n$6\r\na\r\nb\0c\r\n");
		assert_eq!(
			parser.next_request().unwrap(),
			Some(vec![b"a\r\nb\0c".to_vec()])
		);
	}
}
