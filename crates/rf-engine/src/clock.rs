//! Wall clock driven by the tokio timer
//!
//! Anchored to the Unix time at construction and advanced by
//! `tokio::time::Instant`, so a paused test runtime moves it together with
//! every `sleep` in the engine.

use rf_core::{Clock, Timestamp, unix_ms};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin_ms: Timestamp,
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(unix_ms())
    }

    /// Clock reading `start_ms` right now
    pub fn starting_at(start_ms: Timestamp) -> Self {
        Self {
            origin_ms: start_ms,
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> Timestamp {
        self.origin_ms
            .saturating_add(self.origin.elapsed().as_millis() as Timestamp)
    }
}
