//! CLI argument definitions

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use roller_core::units::{parse_duration, parse_size};
use roller_core::{BackupTimezone, RollerConfig, RollerOptions, RotateStrategy};

#[derive(Parser)]
#[command(name = "roller")]
#[command(version, about = "Write to a file that rotates and prunes itself")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy stdin into a rolling file
    Tee(TeeArgs),

    /// Rotate the file now and run one retention pass
    Rotate(RollerArgs),

    /// Run one retention pass without rotating
    Prune(RollerArgs),

    /// List the backups of a file
    Backups(RollerArgs),
}

#[derive(Args)]
pub struct TeeArgs {
    /// Also copy stdin to stdout
    #[arg(short, long)]
    pub passthrough: bool,

    #[command(flatten)]
    pub roller: RollerArgs,
}

/// Options shared by every command. Flags override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct RollerArgs {
    /// Path of the active file
    pub file: Option<PathBuf>,

    /// Config file (.toml, .yaml, .yml, .json)
    #[arg(short, long, env = "ROLLER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Rotate before the file would exceed this size (e.g. 10M, 512K)
    #[arg(short = 's', long, value_parser = parse_size)]
    pub max_file_size: Option<u64>,

    /// Rotate once the file is older than this (e.g. 1h, 30m)
    #[arg(short = 'i', long, value_parser = parse_duration)]
    pub max_interval: Option<Duration>,

    /// Rotation strategy: threshold or every_write
    #[arg(long)]
    pub strategy: Option<RotateStrategy>,

    /// Keep at most this many backups (0 keeps all)
    #[arg(short = 'n', long)]
    pub max_backups: Option<usize>,

    /// Keep at most this many bytes of backups (0 means unlimited)
    #[arg(long, value_parser = parse_size)]
    pub max_total_size: Option<u64>,

    /// Remove backups older than this (e.g. 7d)
    #[arg(long, value_parser = parse_duration)]
    pub max_age: Option<Duration>,

    /// Gzip backups
    #[arg(short = 'z', long)]
    pub compress: bool,

    /// Suffix for compressed backups
    #[arg(long)]
    pub compress_suffix: Option<String>,

    /// chrono format of the timestamp in backup names
    #[arg(long)]
    pub time_format: Option<String>,

    /// Timezone of backup timestamps: utc, local, or +HH:MM
    #[arg(long)]
    pub timezone: Option<BackupTimezone>,
}

impl RollerArgs {
    fn to_options(&self) -> RollerOptions {
        RollerOptions {
            filename: self.file.clone(),
            max_file_size: self.max_file_size,
            max_interval: self.max_interval,
            rotate_strategy: self.strategy,
            max_backups: self.max_backups,
            max_total_size: self.max_total_size,
            max_age: self.max_age,
            compress: self.compress.then_some(true),
            compress_suffix: self.compress_suffix.clone(),
            backup_time_format: self.time_format.clone(),
            backup_timezone: self.timezone,
        }
    }

    /// Merge the config file (if any) with the flags and validate
    pub fn load_config(&self) -> Result<RollerConfig> {
        let base = match &self.config {
            Some(path) => RollerOptions::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RollerOptions::default(),
        };

        let options = base.overlay(self.to_options());
        if options.filename.is_none() {
            anyhow::bail!("No file given; pass FILE or set filename in the config file");
        }
        Ok(options.into_config()?)
    }
}
