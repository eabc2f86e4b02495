//! End-of-stream guard for prefetch worker threads.

use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Held by a prefetch worker for as long as it runs.
///
/// Dropping it marks the stream finished and the worker dead, including when
/// the decoder panics and the worker unwinds. Readers then drain what is left
/// in the ring and report end of stream instead of padding silence forever.
pub(super) struct WorkerGuard {
    finished: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
}

impl WorkerGuard {
    pub(super) fn new(finished: Arc<AtomicBool>, alive: Arc<AtomicBool>) -> Self {
        alive.store(true, Ordering::Release);
        Self { finished, alive }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("prefetch worker panicked, ending stream early");
        }
        // `finished` first: a reader that sees the worker dead must also see
        // the end of stream.
        self.finished.store(true, Ordering::Release);
        self.alive.store(false, Ordering::Release);
    }
}
