//! Summing mixer shared between producer threads and the output thread.
//!
//! [`mixer`] returns two halves. The [`MixerHandle`] is cheap to clone and is
//! used from any thread to add sources; each addition is validated and then
//! sent over a channel. The [`MixerSource`] lives on the output thread: each
//! [`MixerSource::pull`] drains newly added sources, sums every active source
//! into the output block, and retires the sources that ran dry.

use log::debug;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use crate::audio::format::AudioFormat;
use crate::error::EngineError;
use crate::source::channels::adapt_channels;
use crate::source::{PlaybackSource, SampleSource};

/// Counters shared by both halves of a mixer.
#[derive(Debug, Default)]
struct MixerShared {
    active: AtomicUsize,
    added: AtomicU64,
    retired: AtomicU64,
    blocks: AtomicU64,
}

/// Snapshot of mixer activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MixerStats {
    /// Sources queued or playing right now.
    pub active: usize,
    /// Sources accepted by [`MixerHandle::add`] since creation.
    pub added: u64,
    /// Sources retired after running dry.
    pub retired: u64,
    /// Blocks produced by [`MixerSource::pull`].
    pub blocks: u64,
}

/// Counts one source toward [`MixerStats::active`] for as long as it lives.
///
/// Every way a queued source can go away (pruned, dropped with the consumer,
/// still in the channel when the consumer goes, or bounced by a failed send)
/// drops its token, so the count cannot leak.
struct ActiveToken(Arc<MixerShared>);

impl ActiveToken {
    fn new(shared: Arc<MixerShared>) -> Self {
        shared.active.fetch_add(1, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for ActiveToken {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A source on its way into, or inside, the active set.
struct Tracked {
    source: PlaybackSource,
    _token: ActiveToken,
}

/// Create a mixer for `format`.
///
/// * `block_frames` - expected frames per pull, used to size scratch space.
/// * `capacity` - initial room in the active-source list.
pub fn mixer(format: AudioFormat, block_frames: usize, capacity: usize) -> (MixerHandle, MixerSource) {
    let (sender, receiver) = mpsc::channel();
    let shared = Arc::new(MixerShared::default());
    let block_frames = block_frames.max(1);

    let handle = MixerHandle {
        format,
        block_frames,
        sender,
        shared: shared.clone(),
    };
    let source = MixerSource {
        format,
        receiver,
        sources: Vec::with_capacity(capacity),
        scratch: vec![0.0; format.frames_to_samples(block_frames)],
        shared,
    };
    (handle, source)
}

/// Producer-side handle for adding sources.
#[derive(Clone)]
pub struct MixerHandle {
    format: AudioFormat,
    block_frames: usize,
    sender: Sender<Tracked>,
    shared: Arc<MixerShared>,
}

impl MixerHandle {
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Check that a source in `format` can be mixed here.
    ///
    /// # Errors
    /// [`EngineError::FormatMismatch`] on a sample-rate difference and
    /// [`EngineError::UnsupportedConversion`] on a channel layout that
    /// cannot be adapted.
    pub fn validate(&self, format: AudioFormat) -> Result<(), EngineError> {
        if format.sample_rate != self.format.sample_rate {
            return Err(EngineError::FormatMismatch {
                expected: self.format,
                actual: format,
            });
        }
        match (format.channels, self.format.channels) {
            (from, to) if from == to => Ok(()),
            (1, 2) => Ok(()),
            (from, to) => Err(EngineError::UnsupportedConversion { from, to }),
        }
    }

    /// Validate, adapt and queue a source for mixing.
    ///
    /// On error the active set is left untouched.
    pub fn add(&self, source: PlaybackSource) -> Result<(), EngineError> {
        self.validate(source.format())?;
        let kind = source.kind();
        let source = adapt_channels(source, self.format.channels, self.block_frames)?;

        let tracked = Tracked {
            source,
            _token: ActiveToken::new(self.shared.clone()),
        };
        if self.sender.send(tracked).is_err() {
            return Err(EngineError::ShutDown);
        }
        self.shared.added.fetch_add(1, Ordering::Relaxed);
        debug!("mixer accepted {} source", kind);
        Ok(())
    }

    /// Number of sources queued or playing.
    pub fn active_sources(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> MixerStats {
        MixerStats {
            active: self.shared.active.load(Ordering::SeqCst),
            added: self.shared.added.load(Ordering::Relaxed),
            retired: self.shared.retired.load(Ordering::Relaxed),
            blocks: self.shared.blocks.load(Ordering::Relaxed),
        }
    }
}

/// Consumer half, owned by the output thread.
pub struct MixerSource {
    format: AudioFormat,
    receiver: Receiver<Tracked>,
    sources: Vec<Tracked>,
    scratch: Vec<f32>,
    shared: Arc<MixerShared>,
}

impl MixerSource {
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Number of sources this half is currently mixing.
    pub fn mixing(&self) -> usize {
        self.sources.len()
    }

    /// Fill `out` with the sum of every active source.
    ///
    /// Each source is read once; indices past what it produced get nothing
    /// from it. The whole block is always written, so indices no source
    /// reached are silent. Sources whose read returned `0` are dropped
    /// afterwards. The sum is not clipped.
    ///
    /// Only whole frames are mixed. A trailing partial frame is left silent,
    /// and a block shorter than one frame reads no source at all.
    pub fn pull(&mut self, out: &mut [f32]) {
        while let Ok(tracked) = self.receiver.try_recv() {
            self.sources.push(tracked);
        }

        out.fill(0.0);
        self.shared.blocks.fetch_add(1, Ordering::Relaxed);

        let channels = self.format.channels as usize;
        let len = out.len() - out.len() % channels;
        if len == 0 {
            return;
        }
        if self.scratch.len() < len {
            self.scratch.resize(len, 0.0);
        }

        let out = &mut out[..len];
        let scratch = &mut self.scratch[..len];
        let before = self.sources.len();
        self.sources
            .retain_mut(|tracked| mix_into(&mut tracked.source, &mut *out, &mut *scratch));

        let retired = before - self.sources.len();
        if retired > 0 {
            self.shared
                .retired
                .fetch_add(retired as u64, Ordering::Relaxed);
        }
    }
}

impl Drop for MixerSource {
    fn drop(&mut self) {
        if !self.sources.is_empty() {
            debug!("mixer dropped {} unfinished sources", self.sources.len());
        }
    }
}

/// Accumulate one read of `source` into `out`.
///
/// Returns `false` when the read produced nothing.
fn mix_into(source: &mut PlaybackSource, out: &mut [f32], scratch: &mut [f32]) -> bool {
    let produced = source.read(scratch).min(out.len());
    for (mixed, sample) in out[..produced].iter_mut().zip(&scratch[..produced]) {
        *mixed += *sample;
    }
    produced > 0
}
