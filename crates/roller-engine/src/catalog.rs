//! Backup catalog: the rotated files sitting next to the active file

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use roller_core::naming::prefix_and_ext;
use roller_core::{BackupNaming, Error, FileSystem, Result, RollerConfig};

/// A backup found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub name: String,
    /// Rotation time parsed from the name
    pub timestamp: DateTime<Utc>,
    pub size: u64,
    pub compressed: bool,
}

impl BackupEntry {
    /// Name with the compression suffix removed, so a backup and its
    /// compressed copy share one logical name
    pub fn logical_name<'a>(&'a self, compress_suffix: &str) -> &'a str {
        if compress_suffix.is_empty() {
            return &self.name;
        }
        self.name
            .strip_suffix(compress_suffix)
            .unwrap_or(self.name.as_str())
    }
}

/// Lists the backups belonging to one canonical file
#[derive(Clone)]
pub struct BackupCatalog {
    dir: PathBuf,
    prefix: String,
    ext: String,
    compressed_ext: Option<String>,
    naming: BackupNaming,
    fs: Arc<dyn FileSystem>,
}

impl BackupCatalog {
    pub fn new(config: &RollerConfig, fs: Arc<dyn FileSystem>) -> Self {
        let (prefix, ext) = prefix_and_ext(config.filename());
        let suffix = config.compress_suffix();
        let compressed_ext = (!suffix.is_empty()).then(|| format!("{}{}", ext, suffix));

        Self {
            dir: config.dir(),
            prefix,
            ext,
            compressed_ext,
            naming: config.naming().clone(),
            fs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the directory (non-recursively) and return every backup, newest
    /// first. Files whose names do not parse were not produced by a roller
    /// and are ignored.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let entries = self
            .fs
            .read_dir(&self.dir)
            .map_err(|e| Error::io("can't read backup directory", e))?;

        let mut backups: Vec<BackupEntry> = entries
            .into_iter()
            .filter(|entry| !entry.is_dir)
            .filter_map(|entry| {
                let (timestamp, compressed) = self.parse_name(&entry.name)?;
                Some(BackupEntry {
                    path: self.dir.join(&entry.name),
                    name: entry.name,
                    timestamp,
                    size: entry.len,
                    compressed,
                })
            })
            .collect();

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Timestamp and compressed flag for a backup name, trying the plain
    /// extension first and then the compressed one
    fn parse_name(&self, name: &str) -> Option<(DateTime<Utc>, bool)> {
        if let Some(t) = self.naming.time_from_name(name, &self.prefix, &self.ext) {
            return Some((t, false));
        }
        let compressed_ext = self.compressed_ext.as_deref()?;
        self.naming
            .time_from_name(name, &self.prefix, compressed_ext)
            .map(|t| (t, true))
    }
}
