//! Circuit breaker engine: per-breaker sliding-window state and the
//! panel that keys breakers by name.
//!
//! The engine is deliberately clock-free. Every operation that depends
//! on time takes an explicit epoch-second timestamp, which keeps the
//! admission logic deterministic under test and leaves the choice of
//! clock to the caller.

pub mod breaker;
pub mod panel;

pub use breaker::Breaker;
pub use panel::BreakerPanel;
