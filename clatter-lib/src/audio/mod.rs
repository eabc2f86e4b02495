//! Audio format descriptors and shared sample buffers.

pub mod buffer;
pub mod format;
