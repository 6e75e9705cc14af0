//! Helio GPU timers
//!
//! Timestamp queries resolve asynchronously. A [`GpuTimer`] wraps one query in
//! a poll-only state machine that never blocks and never fails a read: until
//! the device reports the stamp, the result is zero. [`GpuTimerManager`]
//! pairs timers into begin/end spans and collates them into per-frame
//! millisecond timings.

pub mod timer;
pub mod manager;

pub use manager::{GpuTimerManager, GpuTiming, ScopedGpuTimer, SharedTimer, TimerPair};
pub use timer::{GpuTimer, QueryHandle, TimerState, TimestampDevice};

/// Result type for GPU timer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the timestamp query device
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create timestamp query: {0}")]
    QueryCreation(String),
}
