//! Per-block execution context.

use tessera_types::{Height, UnixMillis, UnixSeconds};

/// Height and time of the block being executed.
///
/// This is the only source of time the keeper sees; it must come from the
/// block header so that every replica observes the same values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockContext {
    pub height: Height,
    pub time_ms: UnixMillis,
}

impl BlockContext {
    pub fn new(height: Height, time_ms: UnixMillis) -> Self {
        Self { height, time_ms }
    }

    /// Context for a block whose time is a whole number of seconds.
    pub fn at_secs(height: Height, time_secs: UnixSeconds) -> Self {
        Self {
            height,
            time_ms: time_secs.saturating_mul(1000),
        }
    }

    /// Block time truncated to whole seconds (floor, also for pre-epoch times).
    pub fn unix_secs(&self) -> UnixSeconds {
        self.time_ms.div_euclid(1000)
    }
}
