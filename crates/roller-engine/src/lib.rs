//! Roller Engine - rotation, backup catalog, and retention
//!
//! [`Roller`] wraps a canonical file path. Writes go to the active file until
//! a [`RotationTrigger`] fires; the file is then renamed to a timestamped
//! backup and a fresh one is opened in its place. Each rotation wakes a
//! background [`Mill`] that deletes backups beyond the size, count, and age
//! limits and compresses the rest.

mod active;
mod catalog;
mod compress;
mod mill;
mod roller;
mod rotator;
mod scheduler;
mod trigger;

pub use catalog::{BackupCatalog, BackupEntry};
pub use compress::compress_file;
pub use mill::{Mill, MillReport, RetentionDecision, RetentionPolicy};
pub use roller::Roller;
pub use scheduler::{MillSignal, MillWorker};
pub use trigger::{RotateDecision, RotationTrigger};

pub use roller_core::{Error, Result, RollerConfig};

#[cfg(test)]
pub(crate) mod testing;
