//! RESP (REdis Serialization Protocol) codec.
//!
//! Replies are encoded and decoded as [`Value`] trees. Requests arrive
//! through [`RequestParser`], which accepts either multi-bulk frames or
//! inline whitespace-separated commands, chosen by the first byte a
//! connection sends.

pub mod error;
pub mod request;
pub mod value;

pub use error::ProtoError;
pub use request::RequestParser;
pub use value::{decode, encode, Value};
