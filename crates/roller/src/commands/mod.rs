//! Command implementations

pub mod backups;
pub mod prune;
pub mod rotate;
pub mod tee;

use std::sync::Arc;

use roller_core::{RealFs, RollerConfig, SystemClock};
use roller_engine::Mill;

/// Mill over the real filesystem, for one-shot passes outside a running roller
pub fn mill(config: &RollerConfig) -> Mill {
    Mill::new(config, Arc::new(RealFs), Arc::new(SystemClock))
}
