//! Output sinks that pull blocks from a [`MixerSource`].
//!
//! * [`DeviceOutput`] plays through the default audio device via rodio.
//! * [`ClockedOutput`] pulls at the same cadence without any hardware.
//! * [`ManualOutput`] leaves pulling to the caller, one block at a time.

mod clocked;
mod device;
mod manual;

pub use clocked::ClockedOutput;
pub use device::DeviceOutput;
pub use manual::{ManualClock, ManualOutput};

use rodio::Source;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::EngineError;
use crate::mixer::MixerSource;

/// Real-time consumer bound to one mixer.
pub trait OutputSink: Send {
    /// Bind the sink to the mixer it will pull from.
    fn init(&mut self, source: MixerSource) -> Result<(), EngineError>;

    /// Begin pulling at the sink's cadence.
    fn start(&mut self) -> Result<(), EngineError>;

    fn volume(&self) -> f32;

    fn set_volume(&self, volume: f32);

    /// Stop pulling and release the device. Unfinished sources are dropped.
    fn dispose(&mut self);
}

/// Linear gain shared between control threads and the output thread.
#[derive(Debug, Clone)]
pub struct SharedVolume(Arc<AtomicU32>);

impl SharedVolume {
    pub fn new(volume: f32) -> Self {
        Self(Arc::new(AtomicU32::new(sanitize_volume(volume).to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Store a new gain, clamped to `0.0..=1.0`.
    pub fn set(&self, volume: f32) {
        self.0
            .store(sanitize_volume(volume).to_bits(), Ordering::Relaxed);
    }
}

impl Default for SharedVolume {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_VOLUME)
    }
}

fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Pull one block and apply the current volume.
pub(crate) fn render_block(source: &mut MixerSource, volume: &SharedVolume, out: &mut [f32]) {
    source.pull(out);
    let gain = volume.get();
    if gain != 1.0 {
        for sample in out.iter_mut() {
            *sample *= gain;
        }
    }
}

/// Adapts a [`MixerSource`] to rodio's per-sample iterator.
pub(crate) struct OutputStage {
    source: MixerSource,
    volume: SharedVolume,
    block: Vec<f32>,
    position: usize,
}

impl OutputStage {
    pub(crate) fn new(source: MixerSource, volume: SharedVolume, block_frames: usize) -> Self {
        let block_len = source.format().frames_to_samples(block_frames.max(1));
        Self {
            source,
            volume,
            block: vec![0.0; block_len],
            position: block_len,
        }
    }
}

impl Iterator for OutputStage {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.block.len() {
            render_block(&mut self.source, &self.volume, &mut self.block);
            self.position = 0;
        }
        let sample = self.block[self.position];
        self.position += 1;
        Some(sample)
    }
}

impl Source for OutputStage {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.source.format().channels
    }

    fn sample_rate(&self) -> u32 {
        self.source.format().sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::AudioFormat;
    use crate::mixer::mixer;
    use crate::source::cached::{CachedSound, PlaybackCursor};

    #[test]
    fn volume_is_clamped() {
        let volume = SharedVolume::new(3.0);
        assert_eq!(volume.get(), 1.0);
        volume.set(-1.0);
        assert_eq!(volume.get(), 0.0);
        volume.set(f32::NAN);
        assert_eq!(volume.get(), 0.0);
        volume.set(0.25);
        assert_eq!(volume.get(), 0.25);
    }

    #[test]
    fn stage_applies_volume_per_block() {
        let format = AudioFormat::new(8_000, 1);
        let (handle, source) = mixer(format, 4, 4);
        let sound = Arc::new(CachedSound::from_samples(format, vec![1.0; 16]));
        handle.add(PlaybackCursor::new(sound).into()).unwrap();

        let volume = SharedVolume::new(0.5);
        let mut stage = OutputStage::new(source, volume.clone(), 4);
        let first: Vec<f32> = stage.by_ref().take(4).collect();
        assert_eq!(first, vec![0.5; 4]);

        volume.set(1.0);
        let second: Vec<f32> = stage.by_ref().take(4).collect();
        assert_eq!(second, vec![1.0; 4]);
        assert_eq!(stage.channels(), 1);
        assert_eq!(stage.sample_rate(), 8_000);
    }
}
