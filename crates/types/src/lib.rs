//! Fusebox Types
//!
//! Shared domain types for the fusebox circuit breaker: one-second event
//! buckets, the cumulative latency histogram, breaker settings and
//! install-time options, wire event names, and the metrics snapshot
//! exchanged between clients and the server.

pub mod bucket;
pub mod event;
pub mod histogram;
pub mod metrics;
pub mod settings;

pub use bucket::Bucket;
pub use event::{Event, UnknownEventError};
pub use histogram::{Histogram, DEFAULT_LATENCY_BOUNDS};
pub use metrics::{BreakerMetrics, FIELD_LATENCY_BUCKETS, FIELD_LATENCY_COUNT, FIELD_LATENCY_SUM};
pub use settings::{BreakerOptions, BreakerSettings};
