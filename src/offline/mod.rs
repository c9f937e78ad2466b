//! Offline mutation queue and retry machinery
//!
//! - [`queue`] - durable local queue with idempotent, concurrent replay
//! - [`retry`] - bounded retry with fixed or exponential backoff

pub mod queue;
pub mod retry;

pub use queue::{spawn_drain_on_reconnect, DrainConfig, DrainReport, OfflineQueue, MAX_REPLAY_FAILURES};
pub use retry::{BackoffStrategy, RetryConfig, RetryExecutor};
