//! The write-intercepting roller

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use roller_core::{Clock, Error, FileSystem, RealFs, Result, RollerConfig, SystemClock};

use crate::active::ActiveFile;
use crate::mill::Mill;
use crate::rotator::Rotator;
use crate::scheduler::MillWorker;
use crate::trigger::RotationTrigger;

struct State {
    active: Option<ActiveFile>,
    closed: bool,
}

/// Writes to a file that rotates itself.
///
/// Every write goes to the canonical file until the configured size or
/// interval threshold is crossed. The file is then renamed to a timestamped
/// backup next to it and a fresh one takes its place. Rotations wake a
/// background worker that enforces the retention limits on the backups.
///
/// `Roller` is safe to share between threads; writes are serialized.
pub struct Roller {
    config: Arc<RollerConfig>,
    trigger: RotationTrigger,
    rotator: Rotator,
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
    worker: Mutex<Option<MillWorker>>,
}

impl Roller {
    /// Open a roller on the real filesystem and system clock
    pub fn new(config: RollerConfig) -> Result<Self> {
        Self::with_capabilities(config, Arc::new(RealFs), Arc::new(SystemClock))
    }

    /// Open a roller with explicit filesystem and clock
    pub fn with_capabilities(
        config: RollerConfig,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let mill = Mill::new(&config, Arc::clone(&fs), Arc::clone(&clock));
        let (signal, worker) = MillWorker::spawn(mill)
            .map_err(|e| Error::io("can't start retention worker", e))?;

        let rotator = Rotator::new(Arc::clone(&config), fs, Arc::clone(&clock), signal.clone());
        let active = rotator.open_existing_or_new(0)?;

        // Clean up after earlier runs
        signal.request();
        debug!("Opened {}", config.filename().display());

        Ok(Self {
            trigger: RotationTrigger::from_config(&config),
            config,
            rotator,
            clock,
            state: Mutex::new(State {
                active: Some(active),
                closed: false,
            }),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn config(&self) -> &RollerConfig {
        &self.config
    }

    pub fn filename(&self) -> &Path {
        self.config.filename()
    }

    /// Bytes in the active file, or 0 if none is open
    pub fn size(&self) -> u64 {
        self.state.lock().active.as_ref().map_or(0, |a| a.size())
    }

    /// Creation time of the active file
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().active.as_ref().map(|a| a.created_at())
    }

    /// Write `buf` to the active file, rotating around it as configured.
    ///
    /// A write longer than the maximum file size is rejected outright. If a
    /// rotation fails the error is returned and the next write tries again.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let len = buf.len() as u64;
        if let Some(max) = self.config.max_file_size() {
            if len > max {
                return Err(Error::WriteTooLong { len, max });
            }
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }

        let decision = {
            let active = self.rotator.ensure_open(&mut state.active, len)?;
            self.trigger
                .evaluate(active.size(), len, active.age(self.clock.now()))
        };

        let active = if decision.before {
            self.rotator.rotate(&mut state.active)?
        } else {
            self.rotator.ensure_open(&mut state.active, len)?
        };

        let n = active
            .write(buf)
            .map_err(Error::IoError)?;

        if decision.after {
            // The bytes are already written; a failed rotation here only
            // means the next write retries it
            if let Err(e) = self.rotator.rotate(&mut state.active) {
                warn!("Rotation after write failed: {}", e);
            }
        }

        Ok(n)
    }

    /// Rotate now, regardless of the thresholds
    pub fn rotate(&self) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::Closed);
        }
        self.rotator.rotate(&mut state.active)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(active) = state.active.as_mut() {
            active
                .flush()
                .map_err(|e| Error::io("can't flush file", e))?;
        }
        Ok(())
    }

    /// Close the active file and stop the retention worker, waiting for a
    /// pass in progress. Later writes fail with [`Error::Closed`]. Closing
    /// twice is harmless.
    pub fn close(&self) -> Result<()> {
        let result = {
            let mut state = self.state.lock();
            state.closed = true;
            match state.active.take() {
                Some(active) => active
                    .close()
                    .map_err(|e| Error::io("can't close file", e)),
                None => Ok(()),
            }
        };

        if let Some(mut worker) = self.worker.lock().take() {
            worker.shutdown();
            debug!("Closed {}", self.config.filename().display());
        }

        result
    }
}

impl Drop for Roller {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {}: {}", self.config.filename().display(), e);
        }
    }
}

impl io::Write for Roller {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Roller::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Roller::flush(self).map_err(io::Error::from)
    }
}

impl io::Write for &Roller {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Roller::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Roller::flush(self).map_err(io::Error::from)
    }
}
