//! Channel layout conversion between a source and the mixer.

use crate::audio::format::AudioFormat;
use crate::error::EngineError;

use super::{PlaybackSource, SampleSource};

/// Mono source upmixed to interleaved stereo.
///
/// Each mono sample `x` becomes the frame `[x, x]`.
pub struct ChannelAdapter {
    inner: Box<PlaybackSource>,
    format: AudioFormat,
    scratch: Vec<f32>,
}

impl ChannelAdapter {
    /// Wrap a mono source, reserving room for `block_frames` frames per read.
    fn mono_to_stereo(inner: PlaybackSource, block_frames: usize) -> Self {
        let inner_format = inner.format();
        Self {
            inner: Box::new(inner),
            format: AudioFormat::new(inner_format.sample_rate, 2),
            scratch: vec![0.0; block_frames],
        }
    }
}

impl SampleSource for ChannelAdapter {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32]) -> usize {
        let frames = buffer.len() / 2;
        if frames == 0 {
            return 0;
        }
        if self.scratch.len() < frames {
            self.scratch.resize(frames, 0.0);
        }

        let produced = self.inner.read(&mut self.scratch[..frames]);
        for (frame, &sample) in buffer
            .chunks_exact_mut(2)
            .zip(self.scratch[..produced].iter())
        {
            frame[0] = sample;
            frame[1] = sample;
        }
        produced * 2
    }
}

/// Convert `source` to `channels` channels.
///
/// Matching layouts pass through untouched and mono is upmixed to stereo.
///
/// # Errors
/// Any other combination is a configuration error and fails with
/// [`EngineError::UnsupportedConversion`].
pub fn adapt_channels(
    source: PlaybackSource,
    channels: u16,
    block_frames: usize,
) -> Result<PlaybackSource, EngineError> {
    let from = source.format().channels;
    match (from, channels) {
        (from, to) if from == to => Ok(source),
        (1, 2) => Ok(ChannelAdapter::mono_to_stereo(source, block_frames).into()),
        (from, to) => Err(EngineError::UnsupportedConversion { from, to }),
    }
}
