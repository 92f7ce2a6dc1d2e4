//! Rotation decisions

use roller_core::{RollerConfig, RotateStrategy};
use std::time::Duration;

/// What to do around a pending write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotateDecision {
    /// Rotate before writing
    pub before: bool,
    /// Rotate after writing
    pub after: bool,
}

/// Pure rotation predicate built from the configured thresholds.
///
/// Size and interval thresholds are OR-ed: either one firing rotates the file
/// before the write. [`RotateStrategy::EveryWrite`] additionally rotates after
/// every completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationTrigger {
    max_file_size: Option<u64>,
    max_interval: Option<Duration>,
    strategy: RotateStrategy,
}

impl RotationTrigger {
    pub fn new(
        max_file_size: Option<u64>,
        max_interval: Option<Duration>,
        strategy: RotateStrategy,
    ) -> Self {
        Self {
            max_file_size,
            max_interval,
            strategy,
        }
    }

    pub fn from_config(config: &RollerConfig) -> Self {
        Self::new(
            config.max_file_size(),
            config.max_interval(),
            config.strategy(),
        )
    }

    /// Decide around a write of `pending` bytes to a file holding `size`
    /// bytes that was opened `elapsed` ago.
    pub fn evaluate(&self, size: u64, pending: u64, elapsed: Duration) -> RotateDecision {
        RotateDecision {
            before: self.size_exceeded(size, pending) || self.interval_exceeded(elapsed),
            after: self.strategy == RotateStrategy::EveryWrite,
        }
    }

    /// Whether an existing file found at open time should be rotated away
    /// instead of appended to.
    pub fn rotate_existing(&self, existing: u64, pending: u64) -> bool {
        match self.strategy {
            RotateStrategy::EveryWrite => existing > 0,
            RotateStrategy::Threshold => self
                .max_file_size
                .is_some_and(|max| existing.saturating_add(pending) >= max),
        }
    }

    fn size_exceeded(&self, size: u64, pending: u64) -> bool {
        self.max_file_size
            .is_some_and(|max| size.saturating_add(pending) > max)
    }

    fn interval_exceeded(&self, elapsed: Duration) -> bool {
        self.max_interval.is_some_and(|max| elapsed > max)
    }
}
