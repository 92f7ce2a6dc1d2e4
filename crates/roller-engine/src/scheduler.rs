//! Background retention worker and the signal that wakes it

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use std::io;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use roller_core::MILL_THREAD_NAME;

use crate::mill::Mill;

/// Requests a retention pass without waiting for it.
///
/// Backed by a single-slot channel: while one request is pending, further
/// requests are dropped.
#[derive(Debug, Clone)]
pub struct MillSignal {
    tx: Sender<()>,
}

impl MillSignal {
    pub(crate) fn channel() -> (Self, Receiver<()>) {
        let (tx, rx) = bounded(1);
        (Self { tx }, rx)
    }

    /// Ask for a pass. Returns false if one was already pending or the
    /// worker is gone.
    pub fn request(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => {
                debug!("Retention pass already pending");
                false
            }
            Err(TrySendError::Disconnected(())) => false,
        }
    }
}

/// Handle on the background thread running retention passes one at a time
#[derive(Debug)]
pub struct MillWorker {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<Sender<()>>,
}

impl MillWorker {
    /// Start the worker thread
    pub fn spawn(mill: Mill) -> io::Result<(MillSignal, MillWorker)> {
        let (signal, rx) = MillSignal::channel();
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = std::thread::Builder::new()
            .name(MILL_THREAD_NAME.to_string())
            .spawn(move || run(mill, rx, shutdown_rx))?;

        Ok((
            signal,
            MillWorker {
                handle: Some(handle),
                shutdown_tx: Some(shutdown_tx),
            },
        ))
    }

    /// Stop accepting passes and wait for an in-flight one to finish
    pub fn shutdown(&mut self) {
        // Dropping the sender disconnects the shutdown channel
        self.shutdown_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Retention worker panicked");
            }
        }
    }
}

impl Drop for MillWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(mill: Mill, rx: Receiver<()>, shutdown_rx: Receiver<()>) {
    debug!("Retention worker started for {}", mill.dir().display());
    loop {
        select! {
            recv(shutdown_rx) -> _ => break,
            recv(rx) -> msg => {
                if msg.is_err() {
                    break;
                }
                match mill.run_once() {
                    Ok(report) if !report.is_empty() => info!(
                        "Retention pass removed {} and compressed {} backup(s)",
                        report.removed.len(),
                        report.compressed.len()
                    ),
                    Ok(_) => debug!("Retention pass found nothing to do"),
                    Err(e) => warn!("Retention pass failed: {}", e),
                }
            }
        }
    }
    debug!("Retention worker stopped");
}
