//! Roller Core - Shared types, configuration, and error handling

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod fs;
pub mod naming;
pub mod units;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::*;
pub use constants::*;
pub use error::{Error, Result};
pub use fs::{DirEntryInfo, FileStat, FileSystem, RealFs};
pub use naming::{BackupNaming, BackupTimezone, NameFn};
