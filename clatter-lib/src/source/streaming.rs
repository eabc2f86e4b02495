//! Decoder wrapper that releases its decoder the moment it runs dry.

use log::warn;

use crate::audio::format::AudioFormat;
use crate::decode::AudioDecoder;

use super::SampleSource;

/// Lifecycle of the wrapped decoder.
///
/// `Active -> Exhausted -> Released`, driven only by a zero-length read (or
/// by dropping an active wrapper). `Released` is terminal.
enum StreamState {
    Active(Box<dyn AudioDecoder>),
    Exhausted(Box<dyn AudioDecoder>),
    Released,
}

/// A streamed source that owns its decoder exclusively.
///
/// The decoder's [`AudioDecoder::release`] runs exactly once, on the first
/// read that yields no samples, no matter how often the mixer keeps polling
/// afterwards.
pub struct StreamingPlayback {
    format: AudioFormat,
    state: StreamState,
}

impl StreamingPlayback {
    pub fn new(decoder: Box<dyn AudioDecoder>) -> Self {
        Self {
            format: decoder.format(),
            state: StreamState::Active(decoder),
        }
    }

    /// Return true once the decoder has reported end of stream.
    pub fn is_exhausted(&self) -> bool {
        !matches!(self.state, StreamState::Active(_))
    }

    /// Return true once the decoder has been released.
    pub fn is_released(&self) -> bool {
        matches!(self.state, StreamState::Released)
    }

    fn exhaust(&mut self) {
        self.state = match std::mem::replace(&mut self.state, StreamState::Released) {
            StreamState::Active(decoder) => StreamState::Exhausted(decoder),
            other => other,
        };
        self.release();
    }

    fn release(&mut self) {
        match std::mem::replace(&mut self.state, StreamState::Released) {
            StreamState::Active(mut decoder) | StreamState::Exhausted(mut decoder) => {
                decoder.release();
            }
            StreamState::Released => {}
        }
    }
}

impl SampleSource for StreamingPlayback {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buffer: &mut [f32]) -> usize {
        // Nothing was asked for, so a zero here says nothing about the end.
        if buffer.is_empty() {
            return 0;
        }
        let produced = match &mut self.state {
            StreamState::Active(decoder) => match decoder.read(buffer) {
                Ok(read) => read.min(buffer.len()),
                Err(err) => {
                    warn!("retiring streamed source after read error: {}", err);
                    0
                }
            },
            StreamState::Exhausted(_) | StreamState::Released => return 0,
        };

        if produced == 0 {
            self.exhaust();
        }
        produced
    }
}

impl Drop for StreamingPlayback {
    fn drop(&mut self) {
        self.release();
    }
}
