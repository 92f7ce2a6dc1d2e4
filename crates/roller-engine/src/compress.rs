//! Gzip compression of a single backup

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use roller_core::{Error, FileSystem, Result, COMPRESS_BUFFER_SIZE, DEFAULT_FILE_MODE};

/// Compress `src` into `dst`, then remove `src`.
///
/// `dst` gets the mode and (where resolvable) the owner of `src`. The source
/// is only removed once `dst` is completely written and closed; on any
/// failure the partial `dst` is removed and `src` is left alone. An existing
/// `dst` is assumed to be debris from an earlier failed attempt and is
/// overwritten.
pub fn compress_file(fs: &dyn FileSystem, src: &Path, dst: &Path) -> Result<()> {
    let stat = fs
        .stat(src)
        .map_err(|e| Error::io("failed to stat backup", e))?;
    let input = fs
        .open_read(src)
        .map_err(|e| Error::io("failed to open backup", e))?;
    let output = fs
        .create_truncate(dst, stat.mode.unwrap_or(DEFAULT_FILE_MODE))
        .map_err(|e| Error::io("failed to open compressed backup", e))?;

    let encoded = (|| -> io::Result<()> {
        let mut reader = BufReader::with_capacity(COMPRESS_BUFFER_SIZE, input);
        let mut encoder = GzEncoder::new(output, Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        let file = encoder.finish()?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = encoded {
        if let Err(remove_err) = fs.remove_file(dst) {
            warn!(
                "Failed to remove partial {}: {}",
                dst.display(),
                remove_err
            );
        }
        return Err(Error::io("failed to compress backup", e));
    }

    if let Some(owner) = stat.owner {
        if let Err(e) = fs.chown(dst, owner) {
            warn!("Failed to chown {}: {}", dst.display(), e);
        }
    }

    fs.remove_file(src)
        .map_err(|e| Error::io("failed to remove compressed source", e))?;
    debug!("Compressed {} -> {}", src.display(), dst.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FaultyFs;
    use flate2::read::GzDecoder;
    use roller_core::RealFs;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_compress_replaces_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app-1.log");
        let dst = dir.path().join("app-1.log.gz");
        let content = "line of log output\n".repeat(200);
        fs::write(&src, &content).unwrap();

        compress_file(&RealFs, &src, &dst).unwrap();

        assert!(!src.exists());
        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&dst).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, content);
        assert!(fs::metadata(&dst).unwrap().len() < content.len() as u64);
    }

    #[test]
    fn test_compress_overwrites_stale_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app-1.log");
        let dst = dir.path().join("app-1.log.gz");
        fs::write(&src, b"fresh").unwrap();
        fs::write(&dst, b"half-written garbage").unwrap();

        compress_file(&RealFs, &src, &dst).unwrap();

        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&dst).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "fresh");
    }

    #[test]
    fn test_compress_missing_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("missing.log");
        let dst = dir.path().join("missing.log.gz");

        let err = compress_file(&RealFs, &src, &dst).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        assert!(!dst.exists());
    }

    #[test]
    fn test_failed_encode_removes_partial_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app-1.log");
        let dst = dir.path().join("app-1.log.gz");
        let content = "line of log output\n".repeat(200);
        fs::write(&src, &content).unwrap();

        let faulty = FaultyFs::default();
        faulty.unwritable_create(true);
        let err = compress_file(&faulty, &src, &dst).unwrap_err();

        assert!(err.to_string().contains("failed to compress backup"));
        assert!(!dst.exists());
        assert_eq!(fs::read_to_string(&src).unwrap(), content);
    }

    #[cfg(unix)]
    #[test]
    fn test_compress_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let src = dir.path().join("app-1.log");
        let dst = dir.path().join("app-1.log.gz");
        fs::write(&src, b"data").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o640)).unwrap();

        compress_file(&RealFs, &src, &dst).unwrap();
        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }
}
