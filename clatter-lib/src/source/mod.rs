//! Playable sample sources and the wrappers that compose them.

pub mod cached;
pub mod channels;
pub mod streaming;

use crate::audio::format::AudioFormat;

use cached::PlaybackCursor;
use channels::ChannelAdapter;
use streaming::StreamingPlayback;

/// Anything the mixer can pull interleaved `f32` samples from.
pub trait SampleSource: Send {
    /// Format of the samples written by [`SampleSource::read`].
    fn format(&self) -> AudioFormat;

    /// Write up to `buffer.len()` samples and return how many were written.
    ///
    /// `0` means the source is exhausted. Implementations must not block.
    fn read(&mut self, buffer: &mut [f32]) -> usize;
}

/// A source queued on a mixer.
pub enum PlaybackSource {
    /// Cursor over an in-memory cached sound.
    Cached(PlaybackCursor),
    /// Decoder that releases itself when it runs dry.
    Streaming(StreamingPlayback),
    /// Another source converted to the mixer's channel layout.
    Adapted(ChannelAdapter),
}

impl PlaybackSource {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cached(_) => "cached",
            Self::Streaming(_) => "streaming",
            Self::Adapted(_) => "adapted",
        }
    }
}

impl SampleSource for PlaybackSource {
    fn format(&self) -> AudioFormat {
        match self {
            Self::Cached(cursor) => cursor.format(),
            Self::Streaming(stream) => stream.format(),
            Self::Adapted(adapter) => adapter.format(),
        }
    }

    fn read(&mut self, buffer: &mut [f32]) -> usize {
        match self {
            Self::Cached(cursor) => cursor.read(buffer),
            Self::Streaming(stream) => stream.read(buffer),
            Self::Adapted(adapter) => adapter.read(buffer),
        }
    }
}

impl From<PlaybackCursor> for PlaybackSource {
    fn from(value: PlaybackCursor) -> Self {
        Self::Cached(value)
    }
}

impl From<StreamingPlayback> for PlaybackSource {
    fn from(value: StreamingPlayback) -> Self {
        Self::Streaming(value)
    }
}

impl From<ChannelAdapter> for PlaybackSource {
    fn from(value: ChannelAdapter) -> Self {
        Self::Adapted(value)
    }
}
