//! Retention: deciding which backups to delete or compress, and doing it

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use roller_core::{Clock, Error, FileSystem, Result, RollerConfig};

use crate::catalog::{BackupCatalog, BackupEntry};
use crate::compress::compress_file;

/// Size, count, and age limits plus the compression setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_total_size: Option<u64>,
    pub max_backups: Option<usize>,
    pub max_age: Option<Duration>,
    pub compress: bool,
    pub compress_suffix: String,
}

/// Outcome of applying a [`RetentionPolicy`] to a catalog listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionDecision {
    /// Backups that passed every filter, newest first
    pub retained: Vec<BackupEntry>,
    /// Backups that failed at least one filter
    pub remove: Vec<BackupEntry>,
    /// Retained backups that still need compressing
    pub compress: Vec<BackupEntry>,
}

impl RetentionPolicy {
    pub fn from_config(config: &RollerConfig) -> Self {
        Self {
            max_total_size: config.max_total_size(),
            max_backups: config.max_backups(),
            max_age: config.max_age(),
            compress: config.compress(),
            compress_suffix: config.compress_suffix().to_string(),
        }
    }

    /// True when no pass could ever change anything
    pub fn is_noop(&self) -> bool {
        self.max_total_size.is_none()
            && self.max_backups.is_none()
            && self.max_age.is_none()
            && !self.compress
    }

    /// Partition `backups` (newest first). Each filter only sees what the
    /// previous ones kept, so a backup is retained only if it passes all of
    /// them.
    pub fn decide(&self, backups: Vec<BackupEntry>, now: DateTime<Utc>) -> RetentionDecision {
        let mut remove = Vec::new();
        let mut files = backups;

        if let Some(max_total) = self.max_total_size {
            let mut total: u64 = 0;
            let mut remaining = Vec::with_capacity(files.len());
            for f in files {
                total = total.saturating_add(f.size);
                if total > max_total {
                    remove.push(f);
                } else {
                    remaining.push(f);
                }
            }
            files = remaining;
        }

        if let Some(max_count) = self.max_backups {
            let mut preserved: HashSet<String> = HashSet::new();
            let mut remaining = Vec::with_capacity(files.len());
            for f in files {
                // A backup and its compressed copy count once
                preserved.insert(f.logical_name(&self.compress_suffix).to_string());
                if preserved.len() > max_count {
                    remove.push(f);
                } else {
                    remaining.push(f);
                }
            }
            files = remaining;
        }

        if let Some(cutoff) = self.max_age.and_then(|age| cutoff(now, age)) {
            let (remaining, expired): (Vec<_>, Vec<_>) =
                files.into_iter().partition(|f| f.timestamp >= cutoff);
            remove.extend(expired);
            files = remaining;
        }

        let compress = if self.compress {
            files
                .iter()
                .filter(|f| !f.name.ends_with(&self.compress_suffix))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        RetentionDecision {
            retained: files,
            remove,
            compress,
        }
    }
}

/// `now - age`, or `None` if that is before the representable range
fn cutoff(now: DateTime<Utc>, age: Duration) -> Option<DateTime<Utc>> {
    let age = chrono::Duration::from_std(age).ok()?;
    now.checked_sub_signed(age)
}

/// What a retention pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MillReport {
    pub removed: Vec<PathBuf>,
    pub compressed: Vec<PathBuf>,
}

impl MillReport {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.compressed.is_empty()
    }
}

/// Runs retention passes over one canonical file's backups
pub struct Mill {
    policy: RetentionPolicy,
    catalog: BackupCatalog,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
}

impl Mill {
    pub fn new(config: &RollerConfig, fs: Arc<dyn FileSystem>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy: RetentionPolicy::from_config(config),
            catalog: BackupCatalog::new(config, Arc::clone(&fs)),
            fs,
            clock,
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn dir(&self) -> &Path {
        self.catalog.dir()
    }

    /// One retention pass: delete what the policy rejects, then compress
    /// what it keeps. Every step is attempted even after a failure; the
    /// first failure is returned.
    pub fn run_once(&self) -> Result<MillReport> {
        let mut report = MillReport::default();
        if self.policy.is_noop() {
            return Ok(report);
        }

        let backups = self.catalog.list()?;
        let decision = self.policy.decide(backups, self.clock.now());
        debug!(
            "Retention pass over {}: {} retained, {} to remove, {} to compress",
            self.dir().display(),
            decision.retained.len(),
            decision.remove.len(),
            decision.compress.len()
        );

        let mut first_err: Option<Error> = None;

        for f in decision.remove {
            match self.fs.remove_file(&f.path) {
                Ok(()) => {
                    debug!("Removed backup {}", f.path.display());
                    report.removed.push(f.path);
                }
                Err(e) => {
                    warn!("Failed to remove backup {}: {}", f.path.display(), e);
                    first_err.get_or_insert(Error::io(
                        format!("can't remove backup {}", f.path.display()),
                        e,
                    ));
                }
            }
        }

        for f in decision.compress {
            let mut dst = f.path.clone().into_os_string();
            dst.push(&self.policy.compress_suffix);
            let dst = PathBuf::from(dst);

            match compress_file(self.fs.as_ref(), &f.path, &dst) {
                Ok(()) => report.compressed.push(dst),
                Err(e) => {
                    warn!("Failed to compress backup {}: {}", f.path.display(), e);
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}
