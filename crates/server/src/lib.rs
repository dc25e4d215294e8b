//! Breaker service over TCP.
//!
//! Connections speak the RESP framing from `fusebox-proto`; every
//! command operates on a shared [`fusebox_engine::BreakerPanel`] behind
//! an async read/write lock. A background task slides all breaker
//! windows once per tick.

pub mod dispatch;
pub mod server;

pub use dispatch::{dispatch, Outcome, SharedPanel};
pub use server::{serve, spawn_maintenance};
