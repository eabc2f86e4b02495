//! Shared constants for engine defaults.

/// Sample rate of the long-form music engine (Hz).
pub const MUSIC_SAMPLE_RATE: u32 = 48_000;
/// Channel count of the long-form music engine.
pub const MUSIC_CHANNELS: u16 = 2;

/// Sample rate of the sound-effects engine (Hz).
pub const EFFECTS_SAMPLE_RATE: u32 = 22_050;
/// Channel count of the sound-effects engine.
pub const EFFECTS_CHANNELS: u16 = 1;

/// Sample rate used when no preset is selected (Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Channel count used when no preset is selected.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Initial output volume, linear.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Frames pulled from the mixer per output block.
pub const DEFAULT_BLOCK_FRAMES: usize = 512;

/// Audio decoded ahead of the output for streamed files (ms).
pub const DEFAULT_STREAM_BUFFER_MS: f32 = 500.0;

/// Initial capacity of the mixer's active-source list.
///
/// The list still grows past this; the capacity only avoids reallocating on
/// the output thread in the common case.
pub const DEFAULT_MAX_SOURCES: usize = 32;

/// Smallest prefetch ring, in frames, regardless of the configured duration.
pub const MIN_PREFETCH_FRAMES: usize = 4_096;
