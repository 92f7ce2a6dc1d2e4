//! Shared fixtures for engine unit tests

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::path::Path;
use tempfile::TempDir;

use roller_core::{
    DirEntryInfo, FileStat, FileSystem, RealFs, RollerConfig, RollerConfigBuilder,
    DEFAULT_BACKUP_TIME_FORMAT,
};

/// Fixed reference time for tests
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

/// `t0` plus `secs` seconds
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

/// Backup filename for `app.log` rotated at `at(secs)`
pub fn backup_name(secs: i64, suffix: &str) -> String {
    format!(
        "app-{}.log{}",
        at(secs).format(DEFAULT_BACKUP_TIME_FORMAT),
        suffix
    )
}

/// Config for `<dir>/app.log`, customised by `f`
pub fn config_in<F>(dir: &TempDir, f: F) -> RollerConfig
where
    F: FnOnce(RollerConfigBuilder) -> RollerConfigBuilder,
{
    f(RollerConfig::builder(dir.path().join("app.log")))
        .build()
        .unwrap()
}

/// Real filesystem that fails selected operations on demand
#[derive(Default)]
pub struct FaultyFs {
    fail_remove: Mutex<HashSet<String>>,
    fail_rename: Mutex<bool>,
    unwritable_create: Mutex<bool>,
}

impl FaultyFs {
    pub fn fail_remove_of(&self, name: &str) {
        self.fail_remove.lock().insert(name.to_string());
    }

    pub fn fail_rename(&self, fail: bool) {
        *self.fail_rename.lock() = fail;
    }

    /// Make `create_truncate` create the file but hand back a read-only
    /// handle, so every later write to it fails
    pub fn unwritable_create(&self, on: bool) {
        *self.unwritable_create.lock() = on;
    }
}

fn injected() -> io::Error {
    io::Error::new(io::ErrorKind::PermissionDenied, "injected failure")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl FileSystem for FaultyFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        RealFs.stat(path)
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        RealFs.read_dir(dir)
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        RealFs.create_dir_all(dir)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if *self.fail_rename.lock() {
            return Err(injected());
        }
        RealFs.rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove.lock().contains(&file_name(path)) {
            return Err(injected());
        }
        RealFs.remove_file(path)
    }

    fn open_append(&self, path: &Path) -> io::Result<File> {
        RealFs.open_append(path)
    }

    fn create_truncate(&self, path: &Path, mode: u32) -> io::Result<File> {
        let file = RealFs.create_truncate(path, mode)?;
        if *self.unwritable_create.lock() {
            drop(file);
            return File::open(path);
        }
        Ok(file)
    }

    fn open_read(&self, path: &Path) -> io::Result<File> {
        RealFs.open_read(path)
    }

    fn chown(&self, path: &Path, owner: (u32, u32)) -> io::Result<()> {
        RealFs.chown(path, owner)
    }
}
