//! Tee command implementation - copies stdin into a rolling file

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

use roller_engine::Roller;

use crate::cli::TeeArgs;
use crate::output::print_info;

pub async fn execute(args: TeeArgs) -> Result<()> {
    let config = args.roller.load_config()?;
    let filename = config.filename().to_path_buf();
    let max_chunk = config
        .max_file_size()
        .and_then(|max| usize::try_from(max).ok());
    let roller = Arc::new(
        Roller::new(config)
            .with_context(|| format!("Failed to open {}", filename.display()))?,
    );

    let mut copier = {
        let roller = Arc::clone(&roller);
        let passthrough = args.passthrough;
        tokio::task::spawn_blocking(move || copy_stdin(&roller, passthrough, max_chunk))
    };

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let interrupted = loop {
        tokio::select! {
            result = &mut copier => {
                let copied = result.context("stdin reader panicked")??;
                debug!("Copied {} bytes", copied);
                break false;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, rotating");
                if let Err(e) = roller.rotate() {
                    warn!("Rotation failed: {}", e);
                }
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break true;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break true;
            }
        }
    };

    roller.close().context("Failed to close roller")?;

    if interrupted {
        print_info("Interrupted");
        // The stdin reader may still be blocked in read; don't wait for it
        std::process::exit(0);
    }
    Ok(())
}

/// Copy stdin line by line until EOF. Lines longer than the maximum file
/// size are split so each piece fits in one file.
fn copy_stdin(roller: &Roller, passthrough: bool, max_chunk: Option<usize>) -> Result<u64> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut stdout = io::stdout();
    let mut writer = roller;
    let mut line = Vec::new();
    let mut total = 0u64;

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .context("Failed to read stdin")?;
        if n == 0 {
            break;
        }

        match max_chunk {
            Some(max) => {
                for chunk in line.chunks(max) {
                    writer.write_all(chunk)?;
                }
            }
            None => writer.write_all(&line)?,
        }

        if passthrough {
            stdout.write_all(&line)?;
            stdout.flush()?;
        }
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}
