//! Usage bookkeeping for sqlwright providers.
//!
//! Every dispatched request that reaches a backend is recorded against its
//! provider: request count, tokens, a running success rate and a running
//! average response time. Cancelled and timed-out requests are never
//! recorded. Health probes do not touch these statistics.

pub mod model;
pub mod tracker;

pub use model::UsageStat;
pub use tracker::UsageTracker;
