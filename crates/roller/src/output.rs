//! Terminal and JSON output

use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

use roller_engine::{BackupEntry, MillReport};

/// Global flag for JSON output mode
static JSON_MODE: AtomicBool = AtomicBool::new(false);

/// Enable or disable JSON output mode
pub fn set_json_mode(enabled: bool) {
    JSON_MODE.store(enabled, Ordering::SeqCst);
}

/// Check if JSON output mode is enabled
pub fn is_json_mode() -> bool {
    JSON_MODE.load(Ordering::SeqCst)
}

#[derive(Tabled)]
pub struct BackupRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "name")]
    pub name: String,
    #[tabled(rename = "rotated at")]
    pub rotated_at: String,
    #[tabled(rename = "size")]
    pub size: String,
    #[tabled(rename = "gz")]
    pub compressed: String,
}

/// JSON-friendly backup representation
#[derive(Serialize)]
pub struct BackupJson {
    pub name: String,
    pub path: String,
    pub rotated_at: String,
    pub size_bytes: u64,
    pub compressed: bool,
}

impl From<&BackupEntry> for BackupJson {
    fn from(entry: &BackupEntry) -> Self {
        BackupJson {
            name: entry.name.clone(),
            path: entry.path.display().to_string(),
            rotated_at: entry.timestamp.to_rfc3339(),
            size_bytes: entry.size,
            compressed: entry.compressed,
        }
    }
}

#[derive(Serialize)]
struct ReportJson {
    removed: Vec<String>,
    compressed: Vec<String>,
}

impl From<&MillReport> for ReportJson {
    fn from(report: &MillReport) -> Self {
        let paths = |v: &[PathBuf]| -> Vec<String> {
            v.iter().map(|p| p.display().to_string()).collect()
        };
        ReportJson {
            removed: paths(&report.removed),
            compressed: paths(&report.compressed),
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing to JSON: {}", e),
    }
}

pub fn print_backups(backups: &[BackupEntry]) {
    if is_json_mode() {
        let json: Vec<BackupJson> = backups.iter().map(BackupJson::from).collect();
        print_json(&json);
        return;
    }

    if backups.is_empty() {
        println!("No backups");
        return;
    }

    let rows: Vec<BackupRow> = backups
        .iter()
        .enumerate()
        .map(|(i, b)| BackupRow {
            index: i + 1,
            name: b.name.clone(),
            rotated_at: b.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            size: format_bytes(b.size),
            compressed: if b.compressed {
                "yes".green().to_string()
            } else {
                "no".dimmed().to_string()
            },
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(0)).with(Alignment::right()))
        .with(Modify::new(Columns::single(3)).with(Alignment::right()))
        .to_string();

    println!("{}", table);
}

pub fn print_report(report: &MillReport) {
    if is_json_mode() {
        print_json(&ReportJson::from(report));
        return;
    }

    if report.is_empty() {
        print_info("Nothing to prune");
        return;
    }
    for path in &report.removed {
        println!("  {} {}", "removed".red(), file_name(path));
    }
    for path in &report.compressed {
        println!("  {} {}", "compressed".cyan(), file_name(path));
    }
    print_success(&format!(
        "Removed {} and compressed {} backup(s)",
        report.removed.len(),
        report.compressed.len()
    ));
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1}G", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.0}K", bytes as f64 / 1024.0)
    } else if bytes > 0 {
        format!("{}B", bytes)
    } else {
        "0B".to_string()
    }
}

pub fn print_success(message: &str) {
    if !is_json_mode() {
        println!("{} {}", "✓".green(), message);
    }
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_info(message: &str) {
    if !is_json_mode() {
        println!("{} {}", "ℹ".blue(), message);
    }
}
