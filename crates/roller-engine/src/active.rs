//! The file currently being written

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, Write};
use std::time::Duration;

/// Open handle on the canonical file plus the bookkeeping the trigger needs.
///
/// `size` always equals the on-disk size at open time plus the bytes
/// actually written through this handle since.
#[derive(Debug)]
pub(crate) struct ActiveFile {
    file: File,
    size: u64,
    created_at: DateTime<Utc>,
}

impl ActiveFile {
    pub fn new(file: File, size: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            file,
            size,
            created_at,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since the file was created; zero if the clock went backwards
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Single write; a short write only counts the bytes that landed
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }

    /// Flush and release the handle
    pub fn close(mut self) -> io::Result<()> {
        self.file.flush()
    }
}
