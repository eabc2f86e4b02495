//! Serializable engine configuration.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::audio::format::AudioFormat;
use crate::constants::*;
use crate::error::EngineError;

/// Which output sink an engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// The system's default audio device.
    #[default]
    Device,
    /// A timer thread that pulls at the device cadence without hardware.
    Headless,
}

/// Configuration for one [`AudioEngine`](super::AudioEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    #[serde(alias = "rate")]
    pub sample_rate: u32,
    pub channels: u16,
    pub volume: f32,
    #[serde(alias = "block_size")]
    pub block_frames: usize,
    pub stream_buffer_ms: f32,
    pub max_sources: usize,
    pub output: OutputKind,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            volume: DEFAULT_VOLUME,
            block_frames: DEFAULT_BLOCK_FRAMES,
            stream_buffer_ms: DEFAULT_STREAM_BUFFER_MS,
            max_sources: DEFAULT_MAX_SOURCES,
            output: OutputKind::Device,
        }
    }
}

impl EngineSettings {
    /// Long-form music: 48 kHz stereo, large blocks, deep prefetch.
    pub fn music() -> Self {
        Self {
            sample_rate: MUSIC_SAMPLE_RATE,
            channels: MUSIC_CHANNELS,
            block_frames: 2_048,
            stream_buffer_ms: 1_000.0,
            max_sources: 4,
            ..Self::default()
        }
    }

    /// Short effects: 22.05 kHz mono, small blocks for low latency.
    pub fn effects() -> Self {
        Self {
            sample_rate: EFFECTS_SAMPLE_RATE,
            channels: EFFECTS_CHANNELS,
            block_frames: 256,
            stream_buffer_ms: 250.0,
            max_sources: 64,
            ..Self::default()
        }
    }

    pub fn with_output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Load settings from a JSON file. Missing fields take default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let file = File::open(path.as_ref())?;
        let settings: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(settings.sanitized())
    }

    /// Copy of these settings with out-of-range values replaced.
    ///
    /// Zero sizes fall back to the defaults and volume is clamped to
    /// `0.0..=1.0`.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            sample_rate: nonzero_or(self.sample_rate, defaults.sample_rate),
            channels: nonzero_or(self.channels, defaults.channels),
            volume: if self.volume.is_finite() {
                self.volume.clamp(0.0, 1.0)
            } else {
                defaults.volume
            },
            block_frames: nonzero_or(self.block_frames, defaults.block_frames),
            stream_buffer_ms: if self.stream_buffer_ms.is_finite() && self.stream_buffer_ms > 0.0 {
                self.stream_buffer_ms
            } else {
                defaults.stream_buffer_ms
            },
            max_sources: nonzero_or(self.max_sources, defaults.max_sources),
            output: self.output,
        }
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.channels)
    }
}

fn nonzero_or<T: PartialEq + Default>(value: T, fallback: T) -> T {
    if value == T::default() {
        fallback
    } else {
        value
    }
}

/// Settings document describing the music and effects engines together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettingsFile {
    pub music: EngineSettings,
    pub effects: EngineSettings,
}

impl Default for EngineSettingsFile {
    fn default() -> Self {
        Self {
            music: EngineSettings::music(),
            effects: EngineSettings::effects(),
        }
    }
}

impl EngineSettingsFile {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let file = File::open(path.as_ref())?;
        let document: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self {
            music: document.music.sanitized(),
            effects: document.effects.sanitized(),
        })
    }
}
