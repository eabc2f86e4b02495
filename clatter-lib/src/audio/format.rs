//! Sample format descriptor.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sample rate and channel layout of interleaved `f32` audio.
///
/// Samples are always 32-bit float; only the rate and channel count vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// Create a format, raising zero values to `1`.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Number of interleaved samples in one second of audio.
    pub fn samples_per_second(&self) -> usize {
        self.sample_rate as usize * self.channels as usize
    }

    /// Number of interleaved samples in `frames` frames.
    pub fn frames_to_samples(&self, frames: usize) -> usize {
        frames * self.channels as usize
    }

    /// Playback time covered by `samples` interleaved samples.
    pub fn duration_of(&self, samples: usize) -> Duration {
        let frames = samples / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}

impl Display for AudioFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz, {} ch", self.sample_rate, self.channels)
    }
}
