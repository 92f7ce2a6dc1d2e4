//! Backup naming: rendering and parsing the timestamp embedded in backup
//! filenames.
//!
//! A canonical file `/var/log/foo/server.log` rotated at 18:30 on
//! 2016-11-04 becomes `/var/log/foo/server-2016-11-04T18-30-00.000.log`.
//! The timestamp is read back from the name, never from file metadata.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::constants::{BACKUP_SEPARATOR, DEFAULT_BACKUP_TIME_FORMAT};
use crate::error::{Error, Result};

const SAMPLE_NANOS: i64 = 1_478_284_200_000_000_000;

/// Custom backup naming function: maps the canonical path and the rotation
/// time to the path the rotated file is moved to.
pub type NameFn = Arc<dyn Fn(&Path, DateTime<Utc>) -> PathBuf + Send + Sync>;

/// Timezone used when rendering and parsing backup timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum BackupTimezone {
    #[default]
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl FromStr for BackupTimezone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utc" | "z" => Ok(BackupTimezone::Utc),
            "local" => Ok(BackupTimezone::Local),
            other => parse_offset(other)
                .map(BackupTimezone::Fixed)
                .ok_or_else(|| {
                    format!(
                        "Invalid timezone: {}. Expected utc, local, or an offset like +02:00",
                        s
                    )
                }),
        }
    }
}

impl TryFrom<String> for BackupTimezone {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for BackupTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupTimezone::Utc => write!(f, "utc"),
            BackupTimezone::Local => write!(f, "local"),
            BackupTimezone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM`, or `+HH`
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Timestamp format and timezone for backup names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupNaming {
    format: String,
    timezone: BackupTimezone,
}

impl Default for BackupNaming {
    fn default() -> Self {
        Self {
            format: DEFAULT_BACKUP_TIME_FORMAT.to_string(),
            timezone: BackupTimezone::Utc,
        }
    }
}

impl BackupNaming {
    /// Create a naming scheme, rejecting formats that cannot be parsed back
    /// into a full date and time.
    pub fn new<S: Into<String>>(format: S, timezone: BackupTimezone) -> Result<Self> {
        let format = format.into();
        if format.is_empty() {
            return Err(Error::config("backup time format cannot be empty"));
        }
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::config(format!(
                "invalid backup time format: {}",
                format
            )));
        }
        if format.contains('/') || format.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::config(format!(
                "backup time format must not contain path separators: {}",
                format
            )));
        }

        let naming = Self { format, timezone };
        // 2016-11-04T18:30:00Z
        let sample = Utc.timestamp_nanos(SAMPLE_NANOS);
        if naming.parse_timestamp(&naming.format_timestamp(sample)).is_none() {
            return Err(Error::config(format!(
                "backup time format must contain a full date and time: {}",
                naming.format
            )));
        }
        Ok(naming)
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn timezone(&self) -> BackupTimezone {
        self.timezone
    }

    /// Render `t` in the configured timezone
    pub fn format_timestamp(&self, t: DateTime<Utc>) -> String {
        match self.timezone {
            BackupTimezone::Utc => t.format(&self.format).to_string(),
            BackupTimezone::Local => t.with_timezone(&Local).format(&self.format).to_string(),
            BackupTimezone::Fixed(offset) => {
                t.with_timezone(&offset).format(&self.format).to_string()
            }
        }
    }

    /// Parse a rendered timestamp back into UTC
    pub fn parse_timestamp(&self, s: &str) -> Option<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(s, &self.format).ok()?;
        let t = match self.timezone {
            BackupTimezone::Utc => Utc.from_utc_datetime(&naive),
            BackupTimezone::Local => Local
                .from_local_datetime(&naive)
                .earliest()?
                .with_timezone(&Utc),
            BackupTimezone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()?
                .with_timezone(&Utc),
        };
        Some(t)
    }

    /// Default backup name: the timestamp goes between the stem and the
    /// extension, in the canonical file's directory.
    pub fn backup_name(&self, canonical: &Path, t: DateTime<Utc>) -> PathBuf {
        let (prefix, ext) = prefix_and_ext(canonical);
        let name = format!("{}{}{}", prefix, self.format_timestamp(t), ext);
        canonical.with_file_name(name)
    }

    /// Extract the timestamp from `filename`, given the backup prefix and the
    /// extension it should end with. Stripping both first keeps the stem from
    /// confusing the parser.
    pub fn time_from_name(&self, filename: &str, prefix: &str, ext: &str) -> Option<DateTime<Utc>> {
        let rest = filename.strip_prefix(prefix)?;
        let ts = rest.strip_suffix(ext)?;
        self.parse_timestamp(ts)
    }
}

/// Split a canonical path into the backup prefix (`<stem>-`) and the
/// extension including its dot (empty when there is none).
pub fn prefix_and_ext(canonical: &Path) -> (String, String) {
    let stem = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = canonical
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (format!("{}{}", stem, BACKUP_SEPARATOR), ext)
}
