//! End-to-end rotation and retention scenarios

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

use roller_core::{Clock, MockClock, RealFs, RollerConfig, DEFAULT_BACKUP_TIME_FORMAT};
use roller_engine::{BackupCatalog, Mill, Roller};

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap() + ChronoDuration::seconds(secs)
}

fn backup(dir: &Path, secs: i64, suffix: &str) -> std::path::PathBuf {
    dir.join(format!(
        "app-{}.log{}",
        t(secs).format(DEFAULT_BACKUP_TIME_FORMAT),
        suffix
    ))
}

/// Advances one second on every reading, so consecutive rotations never
/// share a backup name
struct TickingClock {
    secs: AtomicI64,
}

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        t(self.secs.fetch_add(1, Ordering::SeqCst))
    }
}

#[test]
fn test_size_cap_rotates_exactly_once() {
    let dir = TempDir::new().unwrap();
    let config = RollerConfig::builder(dir.path().join("app.log"))
        .max_file_size(100)
        .build()
        .unwrap();
    let roller = Roller::new(config).unwrap();

    roller.write(&[b'1'; 60]).unwrap();
    roller.write(&[b'2'; 60]).unwrap();
    roller.close().unwrap();

    let catalog_config = RollerConfig::builder(dir.path().join("app.log"))
        .build()
        .unwrap();
    let backups = BackupCatalog::new(&catalog_config, Arc::new(RealFs))
        .list()
        .unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read(&backups[0].path).unwrap(), vec![b'1'; 60]);
    assert_eq!(fs::read(dir.path().join("app.log")).unwrap(), vec![b'2'; 60]);
}

#[test]
fn test_count_cap_keeps_newest_backups() {
    let dir = TempDir::new().unwrap();
    for secs in [1, 2, 3] {
        fs::write(backup(dir.path(), secs, ""), format!("backup {}", secs)).unwrap();
    }
    let config = RollerConfig::builder(dir.path().join("app.log"))
        .max_backups(2)
        .build()
        .unwrap();

    let mill = Mill::new(&config, Arc::new(RealFs), Arc::new(MockClock::new(t(10))));
    let report = mill.run_once().unwrap();

    assert_eq!(report.removed, vec![backup(dir.path(), 1, "")]);
    assert!(backup(dir.path(), 2, "").exists());
    assert!(backup(dir.path(), 3, "").exists());
}

#[test]
fn test_compression_replaces_backup() {
    let dir = TempDir::new().unwrap();
    let plain = backup(dir.path(), 1, "");
    fs::write(&plain, "some log lines\n".repeat(50)).unwrap();
    let config = RollerConfig::builder(dir.path().join("app.log"))
        .compress(true)
        .compress_suffix(".gz")
        .build()
        .unwrap();

    let mill = Mill::new(&config, Arc::new(RealFs), Arc::new(MockClock::new(t(10))));
    mill.run_once().unwrap();

    let gz = backup(dir.path(), 1, ".gz");
    assert!(!plain.exists());
    let mut decoded = String::new();
    GzDecoder::new(fs::File::open(&gz).unwrap())
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, "some log lines\n".repeat(50));

    // Nothing left to do on a stable directory
    assert!(mill.run_once().unwrap().is_empty());
}

#[test]
fn test_age_and_count_caps_combine() {
    let dir = TempDir::new().unwrap();
    for secs in [0, 100, 200, 300] {
        fs::write(backup(dir.path(), secs, ""), b"x").unwrap();
    }
    let config = RollerConfig::builder(dir.path().join("app.log"))
        .max_backups(3)
        .max_age(std::time::Duration::from_secs(150))
        .build()
        .unwrap();

    let mill = Mill::new(&config, Arc::new(RealFs), Arc::new(MockClock::new(t(320))));
    mill.run_once().unwrap();

    assert!(backup(dir.path(), 300, "").exists());
    assert!(backup(dir.path(), 200, "").exists());
    assert!(!backup(dir.path(), 100, "").exists());
    assert!(!backup(dir.path(), 0, "").exists());
}

#[test]
fn test_concurrent_writers_lose_nothing() {
    const THREADS: usize = 4;
    const LINES: usize = 250;
    const LINE: &[u8] = b"0123456789abcdef\n";

    let dir = TempDir::new().unwrap();
    let config = RollerConfig::builder(dir.path().join("app.log"))
        .max_file_size(1024)
        .build()
        .unwrap();
    let clock = Arc::new(TickingClock {
        secs: AtomicI64::new(0),
    });
    let roller = Arc::new(Roller::with_capabilities(config, Arc::new(RealFs), clock).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let roller = Arc::clone(&roller);
            thread::spawn(move || {
                for _ in 0..LINES {
                    roller.write(LINE).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    roller.close().unwrap();

    let mut total = 0;
    for entry in fs::read_dir(dir.path()).unwrap() {
        let contents = fs::read(entry.unwrap().path()).unwrap();
        assert!(contents.len() <= 1024);
        assert_eq!(contents.len() % LINE.len(), 0);
        total += contents.len();
    }
    assert_eq!(total, THREADS * LINES * LINE.len());
}

#[test]
fn test_reopening_appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let config = RollerConfig::builder(dir.path().join("app.log"))
        .max_file_size(1000)
        .build()
        .unwrap();

    let first = Roller::new(config.clone()).unwrap();
    first.write(b"first run\n").unwrap();
    drop(first);

    let second = Roller::new(config).unwrap();
    assert_eq!(second.size(), 10);
    second.write(b"second run\n").unwrap();
    second.close().unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("app.log")).unwrap(),
        "first run\nsecond run\n"
    );
}
