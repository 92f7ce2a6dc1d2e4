//! Filesystem capability for Roller.
//!
//! The engine never calls `std::fs` directly. Everything it does to the disk
//! goes through [`FileSystem`] so tests can observe or fail individual steps.

use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

#[cfg(unix)]
use crate::constants::DEFAULT_DIR_MODE;

/// Metadata the engine cares about for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub is_dir: bool,
    pub modified: Option<DateTime<Utc>>,
    /// Permission bits (without file type bits), where the platform has them
    pub mode: Option<u32>,
    /// `(uid, gid)`, where the platform has them
    pub owner: Option<(u32, u32)>,
}

/// One entry from a non-recursive directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub len: u64,
}

/// Filesystem operations used by the rotation and retention engine.
pub trait FileSystem: Send + Sync {
    /// Stat a path.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// List a directory without recursing. Entries whose names are not
    /// valid UTF-8 are skipped.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Create a directory and any missing parents.
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Open an existing file for appending.
    fn open_append(&self, path: &Path) -> io::Result<File>;

    /// Create or truncate a file for writing, with `mode` applied on creation.
    fn create_truncate(&self, path: &Path, mode: u32) -> io::Result<File>;

    fn open_read(&self, path: &Path) -> io::Result<File>;

    /// Change the owner of a file. A no-op where ownership is not supported.
    fn chown(&self, path: &Path, owner: (u32, u32)) -> io::Result<()>;
}

/// Real filesystem implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        Ok(file_stat(&meta))
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // Removed or renamed since the listing was taken
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            entries.push(DirEntryInfo {
                name,
                is_dir: meta.is_dir(),
                len: meta.len(),
            });
        }
        Ok(entries)
    }

    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DEFAULT_DIR_MODE);
        }
        builder.create(dir)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn open_append(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().append(true).open(path)
    }

    fn create_truncate(&self, path: &Path, mode: u32) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        options.open(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    #[cfg(unix)]
    fn chown(&self, path: &Path, owner: (u32, u32)) -> io::Result<()> {
        use nix::unistd::{Gid, Uid};

        let (uid, gid) = owner;
        nix::unistd::chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .map_err(io::Error::from)
    }

    #[cfg(not(unix))]
    fn chown(&self, _path: &Path, _owner: (u32, u32)) -> io::Result<()> {
        Ok(())
    }
}

fn file_stat(meta: &fs::Metadata) -> FileStat {
    #[cfg(unix)]
    let (mode, owner) = {
        use std::os::unix::fs::MetadataExt;
        (Some(meta.mode() & 0o7777), Some((meta.uid(), meta.gid())))
    };
    #[cfg(not(unix))]
    let (mode, owner) = (None, None);

    FileStat {
        len: meta.len(),
        is_dir: meta.is_dir(),
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        mode,
        owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_stat_and_read_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.log"), b"hello").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let stat = RealFs.stat(&dir.path().join("a.log")).unwrap();
        assert_eq!(stat.len, 5);
        assert!(!stat.is_dir);
        assert!(stat.modified.is_some());

        let mut entries = RealFs.read_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.log");
        assert_eq!(entries[0].len, 5);
        assert!(entries[1].is_dir);
    }

    #[test]
    fn test_read_dir_tolerates_files_vanishing() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let dir = TempDir::new().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let churn = {
            let path = dir.path().to_path_buf();
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                let mut i = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let a = path.join(format!("churn-{}.log", i % 8));
                    let b = path.join(format!("moved-{}.log", i % 8));
                    fs::write(&a, b"x").unwrap();
                    if i % 2 == 0 {
                        fs::rename(&a, &b).unwrap();
                        fs::remove_file(&b).unwrap();
                    } else {
                        fs::remove_file(&a).unwrap();
                    }
                    i += 1;
                }
            })
        };

        for _ in 0..2000 {
            RealFs.read_dir(dir.path()).unwrap();
        }
        stop.store(true, Ordering::Relaxed);
        churn.join().unwrap();
    }

    #[test]
    fn test_stat_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = RealFs.stat(&dir.path().join("missing.log")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_create_truncate_and_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep/er/file.log");
        RealFs.create_dir_all(path.parent().unwrap()).unwrap();

        let mut file = RealFs.create_truncate(&path, 0o600).unwrap();
        file.write_all(b"one").unwrap();
        drop(file);

        let mut file = RealFs.open_append(&path).unwrap();
        file.write_all(b"two").unwrap();
        drop(file);
        assert_eq!(fs::read_to_string(&path).unwrap(), "onetwo");

        let file = RealFs.create_truncate(&path, 0o600).unwrap();
        drop(file);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_create_truncate_applies_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("private.log");
        drop(RealFs.create_truncate(&path, 0o600).unwrap());

        let stat = RealFs.stat(&path).unwrap();
        assert_eq!(stat.mode, Some(0o600));
        assert!(stat.owner.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_chown_to_current_owner() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("owned.log");
        fs::write(&path, b"x").unwrap();

        let owner = RealFs.stat(&path).unwrap().owner.unwrap();
        RealFs.chown(&path, owner).unwrap();
    }
}
