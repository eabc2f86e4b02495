//! Shared ring buffer used to hand decoded samples to the output thread.

use dasp_ring_buffer::Bounded;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread;
use std::time::Duration;

/// Shared ring buffer for one streamed source's samples.
pub type StreamBuffer = Arc<Mutex<Bounded<Vec<f32>>>>;

const FULL_BUFFER_BACKOFF_MS: u64 = 5;

/// Initialize an empty stream buffer holding at most `capacity` samples.
pub fn init_stream_buffer(capacity: usize) -> StreamBuffer {
    Arc::new(Mutex::new(Bounded::from(vec![0.0; capacity.max(1)])))
}

/// Return the number of samples currently queued.
pub fn buffered_len(buffer: &StreamBuffer) -> usize {
    buffer
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .len()
}

/// Push samples into the ring buffer, backing off while it is full.
///
/// Space is claimed in whole frames of `frame_len` samples so the ring never
/// ends mid-frame while the producer is waiting. Returns `false` if `abort`
/// was raised before every sample was queued.
pub fn push_samples_blocking(
    buffer: &StreamBuffer,
    samples: &[f32],
    frame_len: usize,
    abort: &AtomicBool,
) -> bool {
    let frame_len = frame_len.max(1);
    let mut offset = 0usize;
    while offset < samples.len() {
        if abort.load(Ordering::Relaxed) {
            return false;
        }

        let mut ring = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let free = ring.max_len().saturating_sub(ring.len());
        let remaining = free - free % frame_len;
        if remaining == 0 {
            drop(ring);
            thread::sleep(Duration::from_millis(FULL_BUFFER_BACKOFF_MS));
            continue;
        }

        let take = remaining.min(samples.len() - offset);
        for sample in samples[offset..offset + take].iter().copied() {
            ring.push(sample);
        }
        offset += take;
    }
    true
}

/// Pop whole frames into `out` without waiting for the lock.
///
/// At most `out.len()` samples are taken, rounded down to a multiple of
/// `frame_len`. Returns `None` when the producer currently holds the lock.
pub fn pop_samples_nonblocking(
    buffer: &StreamBuffer,
    out: &mut [f32],
    frame_len: usize,
) -> Option<usize> {
    let mut ring = match buffer.try_lock() {
        Ok(ring) => ring,
        Err(TryLockError::WouldBlock) => return None,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    };

    let frame_len = frame_len.max(1);
    let available = out.len().min(ring.len());
    let take = available - available % frame_len;
    for slot in out[..take].iter_mut() {
        match ring.pop() {
            Some(sample) => *slot = sample,
            None => break,
        }
    }
    Some(take)
}
