//! Decoder collaborators that turn audio files into interleaved `f32` samples.
//!
//! [`FileDecoder`] reads straight from disk and may block, so it is used
//! where blocking is acceptable: loading cached sounds on the caller's thread
//! and feeding a [`PrefetchDecoder`] worker. The prefetch decoder is what the
//! output thread actually reads from when a file is streamed.

mod file;
mod guard;
mod prefetch;

pub use file::FileDecoder;
pub use prefetch::PrefetchDecoder;

use crate::audio::format::AudioFormat;
use crate::error::EngineError;

/// Pull-based decoder handle.
pub trait AudioDecoder: Send {
    /// Native format of the decoded samples.
    fn format(&self) -> AudioFormat;

    /// Fill `buffer` with up to `buffer.len()` interleaved samples.
    ///
    /// Returns the number of samples written; `0` means end of stream.
    fn read(&mut self, buffer: &mut [f32]) -> Result<usize, EngineError>;

    /// Close the underlying file or worker.
    fn release(&mut self) {}
}
