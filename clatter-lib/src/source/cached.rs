//! Fully decoded in-memory sounds and cursors that play them.

use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::format::AudioFormat;
use crate::decode::{AudioDecoder, FileDecoder};
use crate::error::EngineError;

use super::SampleSource;

/// Immutable decoded PCM data plus its format.
///
/// Shared behind an [`Arc`] by every cursor that plays it.
#[derive(Debug)]
pub struct CachedSound {
    samples: Box<[f32]>,
    format: AudioFormat,
}

impl CachedSound {
    /// Decode a whole file into memory.
    ///
    /// # Errors
    /// Returns [`EngineError::DecodeOpen`] if the file cannot be opened and
    /// [`EngineError::Decode`] if decoding fails part way through.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut decoder = FileDecoder::open(path)?;
        let sound = Self::from_decoder(&mut decoder)?;
        debug!(
            "cached {} ({}, {} samples)",
            path.display(),
            sound.format,
            sound.len()
        );
        Ok(sound)
    }

    /// Drain a decoder into memory one second of audio at a time.
    ///
    /// A short final block is kept exactly as produced.
    pub fn from_decoder(decoder: &mut dyn AudioDecoder) -> Result<Self, EngineError> {
        let format = decoder.format();
        let mut block = vec![0.0_f32; format.samples_per_second()];
        let mut whole = Vec::with_capacity(block.len());

        loop {
            let read = decoder.read(&mut block)?;
            if read == 0 {
                break;
            }
            whole.extend_from_slice(&block[..read]);
        }
        decoder.release();

        Ok(Self::from_samples(format, whole))
    }

    /// Wrap already-decoded interleaved samples.
    pub fn from_samples(format: AudioFormat, samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into_boxed_slice(),
            format,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Total number of interleaved samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.samples.len())
    }
}

/// Sequential read position over a shared [`CachedSound`].
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    sound: Arc<CachedSound>,
    position: usize,
}

impl PlaybackCursor {
    pub fn new(sound: Arc<CachedSound>) -> Self {
        Self { sound, position: 0 }
    }

    /// Number of samples already played.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.sound.len()
    }

    pub fn sound(&self) -> &Arc<CachedSound> {
        &self.sound
    }
}

impl SampleSource for PlaybackCursor {
    fn format(&self) -> AudioFormat {
        self.sound.format
    }

    fn read(&mut self, buffer: &mut [f32]) -> usize {
        let available = self.sound.len() - self.position;
        let produced = available.min(buffer.len());
        buffer[..produced]
            .copy_from_slice(&self.sound.samples[self.position..self.position + produced]);
        self.position += produced;
        produced
    }
}
