//! Non-blocking decoder that streams from a background worker thread.

use log::{debug, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::buffer::{
    buffered_len, init_stream_buffer, pop_samples_nonblocking, push_samples_blocking,
    StreamBuffer,
};
use crate::audio::format::AudioFormat;
use crate::constants::MIN_PREFETCH_FRAMES;
use crate::error::EngineError;

use super::guard::WorkerGuard;
use super::{AudioDecoder, FileDecoder};

const PREFILL_TIMEOUT: Duration = Duration::from_millis(250);
const PREFILL_POLL: Duration = Duration::from_millis(1);

/// Decoder whose `read` never touches the disk.
///
/// A worker thread owns the inner decoder and keeps a bounded ring buffer
/// topped up. Reads only pop from the ring with `try_lock`; when the ring is
/// contended or empty while the worker is still running, the missing samples
/// are filled with silence and counted as an underrun. `read` returns `0`
/// only after the worker has finished and the ring is drained.
pub struct PrefetchDecoder {
    format: AudioFormat,
    buffer: StreamBuffer,
    finished: Arc<AtomicBool>,
    abort: Arc<AtomicBool>,
    worker_alive: Arc<AtomicBool>,
    underruns: u64,
}

impl PrefetchDecoder {
    /// Open `path` on the calling thread and start prefetching it.
    ///
    /// # Errors
    /// Returns [`EngineError::DecodeOpen`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, buffer_ms: f32) -> Result<Self, EngineError> {
        let decoder = FileDecoder::open(path)?;
        Ok(Self::spawn(Box::new(decoder), buffer_ms))
    }

    /// Move an already-opened decoder onto a prefetch worker.
    ///
    /// Blocks the caller briefly until the ring holds some audio, so the
    /// first reads on the output thread do not start with an underrun.
    pub fn spawn(decoder: Box<dyn AudioDecoder>, buffer_ms: f32) -> Self {
        let format = decoder.format();
        let frame_len = format.channels as usize;
        let requested = (format.samples_per_second() as f32 * buffer_ms.max(0.0) / 1000.0) as usize;
        // Whole frames only, so an underrun never splits a frame.
        let capacity = (requested - requested % frame_len)
            .max(format.frames_to_samples(MIN_PREFETCH_FRAMES));
        let buffer = init_stream_buffer(capacity);

        let finished = Arc::new(AtomicBool::new(false));
        let abort = Arc::new(AtomicBool::new(false));
        let worker_alive = Arc::new(AtomicBool::new(true));

        let chunk_len = format.frames_to_samples((capacity / frame_len / 4).max(1));
        let worker = PrefetchWorker {
            decoder,
            buffer: buffer.clone(),
            abort: abort.clone(),
            frame_len,
            chunk_len,
        };
        let guard = WorkerGuard::new(finished.clone(), worker_alive.clone());
        let spawned = thread::Builder::new()
            .name("clatter-prefetch".to_string())
            .spawn(move || worker.run(guard));
        // On failure the closure, and with it the guard, is dropped, which
        // leaves the stream finished and empty.
        if let Err(err) = spawned {
            warn!("failed to spawn prefetch worker: {}", err);
        }

        let this = Self {
            format,
            buffer,
            finished,
            abort,
            worker_alive,
            underruns: 0,
        };
        this.wait_for_prefill(capacity / 2);
        this
    }

    /// Number of reads that had to be padded with silence.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// Return true while the worker thread is still running.
    pub fn is_worker_alive(&self) -> bool {
        self.worker_alive.load(Ordering::Acquire)
    }

    fn wait_for_prefill(&self, target: usize) {
        let deadline = Instant::now() + PREFILL_TIMEOUT;
        while Instant::now() < deadline {
            if self.finished.load(Ordering::Acquire) || buffered_len(&self.buffer) >= target {
                return;
            }
            thread::sleep(PREFILL_POLL);
        }
    }

    fn record_underrun(&mut self) {
        self.underruns += 1;
        if self.underruns == 1 {
            debug!("prefetch underrun ({}), padding with silence", self.format);
        }
    }
}

impl AudioDecoder for PrefetchDecoder {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32]) -> Result<usize, EngineError> {
        let frame_len = self.format.channels as usize;
        let popped = match pop_samples_nonblocking(&self.buffer, buffer, frame_len) {
            Some(popped) => popped,
            None => {
                buffer.fill(0.0);
                self.record_underrun();
                return Ok(buffer.len());
            }
        };
        if popped == buffer.len() {
            return Ok(popped);
        }

        if self.finished.load(Ordering::Acquire) {
            // Samples pushed between the pop and the flag check still count.
            let tail =
                pop_samples_nonblocking(&self.buffer, &mut buffer[popped..], frame_len).unwrap_or(0);
            return Ok(popped + tail);
        }

        buffer[popped..].fill(0.0);
        self.record_underrun();
        Ok(buffer.len())
    }

    fn release(&mut self) {
        self.abort.store(true, Ordering::Release);
    }
}

impl Drop for PrefetchDecoder {
    fn drop(&mut self) {
        self.abort.store(true, Ordering::Release);
    }
}

struct PrefetchWorker {
    decoder: Box<dyn AudioDecoder>,
    buffer: StreamBuffer,
    abort: Arc<AtomicBool>,
    frame_len: usize,
    chunk_len: usize,
}

impl PrefetchWorker {
    /// Decode into the ring until end of stream, error or abort.
    ///
    /// `guard` marks the stream finished when this returns or unwinds.
    fn run(mut self, guard: WorkerGuard) {
        let _guard = guard;
        let mut chunk = vec![0.0_f32; self.chunk_len];

        loop {
            if self.abort.load(Ordering::Relaxed) {
                break;
            }
            match self.decoder.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => {
                    let pushed = push_samples_blocking(
                        &self.buffer,
                        &chunk[..read],
                        self.frame_len,
                        &self.abort,
                    );
                    if !pushed {
                        break;
                    }
                }
                Err(err) => {
                    warn!("streaming decode stopped: {}", err);
                    break;
                }
            }
        }

        self.decoder.release();
    }
}
