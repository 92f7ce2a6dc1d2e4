//! Opening and rotating the canonical file

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use roller_core::{
    Clock, Error, FileSystem, Result, RollerConfig, BACKUP_NAME_ATTEMPTS, DEFAULT_FILE_MODE,
};

use crate::active::ActiveFile;
use crate::scheduler::MillSignal;
use crate::trigger::RotationTrigger;

/// Moves the canonical file aside and replaces it. Holds no state of its
/// own; the active file lives in a slot owned by the caller's lock.
pub(crate) struct Rotator {
    config: Arc<RollerConfig>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    trigger: RotationTrigger,
    signal: MillSignal,
}

impl Rotator {
    pub fn new(
        config: Arc<RollerConfig>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        signal: MillSignal,
    ) -> Self {
        let trigger = RotationTrigger::from_config(&config);
        Self {
            config,
            fs,
            clock,
            trigger,
            signal,
        }
    }

    /// Close whatever is in `slot`, move the canonical file to a backup, and
    /// open a fresh one. On failure `slot` is left empty.
    pub fn rotate<'a>(&self, slot: &'a mut Option<ActiveFile>) -> Result<&'a mut ActiveFile> {
        if let Some(active) = slot.take() {
            active
                .close()
                .map_err(|e| Error::io("can't close file", e))?;
        }

        let active = self.open_new()?;
        self.signal.request();
        Ok(slot.insert(active))
    }

    /// Return the active file, opening one first if `slot` is empty
    pub fn ensure_open<'a>(
        &self,
        slot: &'a mut Option<ActiveFile>,
        pending: u64,
    ) -> Result<&'a mut ActiveFile> {
        let active = match slot.take() {
            Some(active) => active,
            None => self.open_existing_or_new(pending)?,
        };
        Ok(slot.insert(active))
    }

    /// Append to the canonical file if it exists and may take `pending` more
    /// bytes, otherwise start a new one
    pub fn open_existing_or_new(&self, pending: u64) -> Result<ActiveFile> {
        let filename = self.config.filename();
        let stat = match self.fs.stat(filename) {
            Ok(stat) => stat,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.rotate_fresh(),
            Err(e) => return Err(Error::io("error getting log file info", e)),
        };

        if self.trigger.rotate_existing(stat.len, pending) {
            debug!(
                "Existing {} ({} bytes) is due for rotation",
                filename.display(),
                stat.len
            );
            return self.rotate_fresh();
        }

        match self.fs.open_append(filename) {
            Ok(file) => {
                let created_at = stat.modified.unwrap_or_else(|| self.clock.now());
                debug!(
                    "Appending to existing {} ({} bytes)",
                    filename.display(),
                    stat.len
                );
                Ok(ActiveFile::new(file, stat.len, created_at))
            }
            Err(e) => {
                // Unreadable or otherwise broken; move it aside
                warn!("Can't append to {}: {}", filename.display(), e);
                self.rotate_fresh()
            }
        }
    }

    fn rotate_fresh(&self) -> Result<ActiveFile> {
        let active = self.open_new()?;
        self.signal.request();
        Ok(active)
    }

    fn open_new(&self) -> Result<ActiveFile> {
        let filename = self.config.filename();
        let now = self.clock.now();

        self.fs
            .create_dir_all(&self.config.dir())
            .map_err(|e| Error::io("can't make directories for new file", e))?;

        let (mode, owner) = match self.fs.stat(filename) {
            Ok(stat) => {
                self.move_to_backup(filename, now)?;
                (stat.mode.unwrap_or(DEFAULT_FILE_MODE), stat.owner)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => (DEFAULT_FILE_MODE, None),
            Err(e) => return Err(Error::io("can't stat file", e)),
        };

        let file = self
            .fs
            .create_truncate(filename, mode)
            .map_err(|e| Error::io("can't open new file", e))?;

        if let Some(owner) = owner {
            if let Err(e) = self.fs.chown(filename, owner) {
                warn!("Failed to chown {}: {}", filename.display(), e);
            }
        }

        Ok(ActiveFile::new(file, 0, now))
    }

    /// Backup path for a rotation at `now`. A name already on disk is never
    /// reused; the timestamp is pushed forward a millisecond at a time instead.
    fn free_backup_name(&self, now: DateTime<Utc>) -> Result<PathBuf> {
        let mut t = now;
        for _ in 0..BACKUP_NAME_ATTEMPTS {
            let candidate = self.config.backup_name(t);
            if !self.name_taken(&candidate)? {
                return Ok(candidate);
            }
            t += chrono::Duration::milliseconds(1);
        }
        Err(Error::io(
            "can't rename file",
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free backup name near {}", self.config.backup_name(now).display()),
            ),
        ))
    }

    /// A name is taken if the backup or its compressed form exists
    fn name_taken(&self, candidate: &Path) -> Result<bool> {
        let suffix = self.config.compress_suffix();
        let mut names = vec![candidate.to_path_buf()];
        if !suffix.is_empty() {
            let mut compressed = candidate.as_os_str().to_os_string();
            compressed.push(suffix);
            names.push(PathBuf::from(compressed));
        }
        for name in &names {
            match self.fs.stat(name) {
                Ok(_) => return Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io("can't stat backup", e)),
            }
        }
        Ok(false)
    }

    fn move_to_backup(&self, filename: &Path, now: DateTime<Utc>) -> Result<()> {
        let backup = self.free_backup_name(now)?;
        if let Some(parent) = backup.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs
                .create_dir_all(parent)
                .map_err(|e| Error::io("can't make directories for backup", e))?;
        }

        self.fs
            .rename(filename, &backup)
            .map_err(|e| Error::io("can't rename file", e))?;
        info!("Rotated {} to {}", filename.display(), backup.display());
        Ok(())
    }
}
