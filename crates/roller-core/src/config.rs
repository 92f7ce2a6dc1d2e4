//! Roller configuration
//!
//! [`RollerConfig`] is the validated, immutable configuration an engine is
//! built from. [`RollerOptions`] is the loosely typed shape read from config
//! files, in any of these formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::naming::{BackupNaming, BackupTimezone, NameFn};
use crate::units;

/// How the active file decides to rotate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateStrategy {
    /// Rotate before a write when the size or interval threshold is crossed
    #[default]
    Threshold,
    /// Rotate after every completed write
    EveryWrite,
}

impl RotateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotateStrategy::Threshold => "threshold",
            RotateStrategy::EveryWrite => "every_write",
        }
    }
}

impl fmt::Display for RotateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotateStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "threshold" | "size" => Ok(RotateStrategy::Threshold),
            "every_write" | "direct" => Ok(RotateStrategy::EveryWrite),
            _ => Err(format!(
                "Invalid rotate strategy: {}. Expected threshold or every_write",
                s
            )),
        }
    }
}

/// Validated engine configuration. Built once through [`RollerConfig::builder`]
/// and never mutated afterwards.
#[derive(Clone)]
pub struct RollerConfig {
    filename: PathBuf,
    max_file_size: Option<u64>,
    max_interval: Option<Duration>,
    strategy: RotateStrategy,
    max_backups: Option<usize>,
    max_total_size: Option<u64>,
    max_age: Option<Duration>,
    compress: bool,
    compress_suffix: String,
    naming: BackupNaming,
    name_fn: Option<NameFn>,
}

impl fmt::Debug for RollerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollerConfig")
            .field("filename", &self.filename)
            .field("max_file_size", &self.max_file_size)
            .field("max_interval", &self.max_interval)
            .field("strategy", &self.strategy)
            .field("max_backups", &self.max_backups)
            .field("max_total_size", &self.max_total_size)
            .field("max_age", &self.max_age)
            .field("compress", &self.compress)
            .field("compress_suffix", &self.compress_suffix)
            .field("naming", &self.naming)
            .field("name_fn", &self.name_fn.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl RollerConfig {
    pub fn builder<P: Into<PathBuf>>(filename: P) -> RollerConfigBuilder {
        RollerConfigBuilder::new(filename)
    }

    /// Canonical path of the active file
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Directory holding the active file and its backups
    pub fn dir(&self) -> PathBuf {
        match self.filename.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn max_file_size(&self) -> Option<u64> {
        self.max_file_size
    }

    pub fn max_interval(&self) -> Option<Duration> {
        self.max_interval
    }

    pub fn strategy(&self) -> RotateStrategy {
        self.strategy
    }

    pub fn max_backups(&self) -> Option<usize> {
        self.max_backups
    }

    pub fn max_total_size(&self) -> Option<u64> {
        self.max_total_size
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn compress_suffix(&self) -> &str {
        &self.compress_suffix
    }

    pub fn naming(&self) -> &BackupNaming {
        &self.naming
    }

    /// Whether any retention threshold or compression is configured
    pub fn has_retention(&self) -> bool {
        self.max_total_size.is_some()
            || self.max_backups.is_some()
            || self.max_age.is_some()
            || self.compress
    }

    /// Path the canonical file is moved to when rotated at `t`
    pub fn backup_name(&self, t: chrono::DateTime<chrono::Utc>) -> PathBuf {
        match &self.name_fn {
            Some(f) => f(&self.filename, t),
            None => self.naming.backup_name(&self.filename, t),
        }
    }
}

/// Builder for [`RollerConfig`]
pub struct RollerConfigBuilder {
    filename: PathBuf,
    max_file_size: Option<u64>,
    max_interval: Option<Duration>,
    strategy: RotateStrategy,
    max_backups: Option<usize>,
    max_total_size: Option<u64>,
    max_age: Option<Duration>,
    compress: bool,
    compress_suffix: String,
    time_format: String,
    timezone: BackupTimezone,
    name_fn: Option<NameFn>,
}

impl RollerConfigBuilder {
    pub fn new<P: Into<PathBuf>>(filename: P) -> Self {
        Self {
            filename: filename.into(),
            max_file_size: None,
            max_interval: None,
            strategy: RotateStrategy::default(),
            max_backups: None,
            max_total_size: None,
            max_age: None,
            compress: false,
            compress_suffix: DEFAULT_COMPRESS_SUFFIX.to_string(),
            time_format: DEFAULT_BACKUP_TIME_FORMAT.to_string(),
            timezone: BackupTimezone::default(),
            name_fn: None,
        }
    }

    /// Rotate before a write that would push the file past `bytes`
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Rotate before a write once the file is older than `interval`
    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = Some(interval);
        self
    }

    pub fn strategy(mut self, strategy: RotateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Keep at most `count` backups; 0 keeps all of them
    pub fn max_backups(mut self, count: usize) -> Self {
        self.max_backups = (count > 0).then_some(count);
        self
    }

    /// Keep at most `bytes` of backups; 0 means unlimited
    pub fn max_total_size(mut self, bytes: u64) -> Self {
        self.max_total_size = (bytes > 0).then_some(bytes);
        self
    }

    /// Remove backups older than `age`; zero means never
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = (!age.is_zero()).then_some(age);
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn compress_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.compress_suffix = suffix.into();
        self
    }

    pub fn time_format<S: Into<String>>(mut self, format: S) -> Self {
        self.time_format = format.into();
        self
    }

    pub fn timezone(mut self, timezone: BackupTimezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Replace the default `<stem>-<timestamp><ext>` naming. Backups produced
    /// by a custom function are only seen by retention if they still match
    /// the configured prefix and time format.
    pub fn name_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Path, chrono::DateTime<chrono::Utc>) -> PathBuf + Send + Sync + 'static,
    {
        self.name_fn = Some(std::sync::Arc::new(f));
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<RollerConfig> {
        if self.filename.as_os_str().is_empty() {
            return Err(Error::config("filename cannot be empty"));
        }
        if self.filename.file_name().is_none() {
            return Err(Error::config(format!(
                "filename must name a file: {}",
                self.filename.display()
            )));
        }
        if self.max_file_size == Some(0) {
            return Err(Error::config("max file size cannot be 0"));
        }
        if self.compress && self.compress_suffix.is_empty() {
            return Err(Error::config(
                "compress suffix cannot be empty when compression is enabled",
            ));
        }

        let naming = BackupNaming::new(self.time_format, self.timezone)?;

        Ok(RollerConfig {
            filename: self.filename,
            max_file_size: self.max_file_size,
            max_interval: self.max_interval,
            strategy: self.strategy,
            max_backups: self.max_backups,
            max_total_size: self.max_total_size,
            max_age: self.max_age,
            compress: self.compress,
            compress_suffix: self.compress_suffix,
            naming,
            name_fn: self.name_fn,
        })
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Roller options as written in a config file. Every field is optional so
/// a file can be layered under command-line flags.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollerOptions {
    pub filename: Option<PathBuf>,
    #[serde(default, deserialize_with = "units::deserialize_size")]
    pub max_file_size: Option<u64>,
    #[serde(default, deserialize_with = "units::deserialize_duration")]
    pub max_interval: Option<Duration>,
    pub rotate_strategy: Option<RotateStrategy>,
    pub max_backups: Option<usize>,
    #[serde(default, deserialize_with = "units::deserialize_size")]
    pub max_total_size: Option<u64>,
    #[serde(default, deserialize_with = "units::deserialize_duration")]
    pub max_age: Option<Duration>,
    pub compress: Option<bool>,
    pub compress_suffix: Option<String>,
    pub backup_time_format: Option<String>,
    pub backup_timezone: Option<BackupTimezone>,
}

impl RollerOptions {
    /// Load options from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected one of: {:?}",
                path.display(),
                CONFIG_EXTENSIONS
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Parse options content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => Self::from_toml(content),
            ConfigFormat::Yaml => Self::from_yaml(content),
            ConfigFormat::Json => Self::from_json(content),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Layer `other` on top of `self`; fields set in `other` win
    pub fn overlay(self, other: RollerOptions) -> Self {
        Self {
            filename: other.filename.or(self.filename),
            max_file_size: other.max_file_size.or(self.max_file_size),
            max_interval: other.max_interval.or(self.max_interval),
            rotate_strategy: other.rotate_strategy.or(self.rotate_strategy),
            max_backups: other.max_backups.or(self.max_backups),
            max_total_size: other.max_total_size.or(self.max_total_size),
            max_age: other.max_age.or(self.max_age),
            compress: other.compress.or(self.compress),
            compress_suffix: other.compress_suffix.or(self.compress_suffix),
            backup_time_format: other.backup_time_format.or(self.backup_time_format),
            backup_timezone: other.backup_timezone.or(self.backup_timezone),
        }
    }

    /// Convert to a validated [`RollerConfig`]
    pub fn into_config(self) -> Result<RollerConfig> {
        let filename = self
            .filename
            .ok_or_else(|| Error::config("filename cannot be empty"))?;

        let mut builder = RollerConfig::builder(filename)
            .strategy(self.rotate_strategy.unwrap_or_default())
            .compress(self.compress.unwrap_or(false));

        if let Some(size) = self.max_file_size {
            builder = builder.max_file_size(size);
        }
        if let Some(interval) = self.max_interval {
            builder = builder.max_interval(interval);
        }
        if let Some(count) = self.max_backups {
            builder = builder.max_backups(count);
        }
        if let Some(total) = self.max_total_size {
            builder = builder.max_total_size(total);
        }
        if let Some(age) = self.max_age {
            builder = builder.max_age(age);
        }
        if let Some(suffix) = self.compress_suffix {
            builder = builder.compress_suffix(suffix);
        }
        if let Some(format) = self.backup_time_format {
            builder = builder.time_format(format);
        }
        if let Some(tz) = self.backup_timezone {
            builder = builder.timezone(tz);
        }

        builder.build()
    }
}
