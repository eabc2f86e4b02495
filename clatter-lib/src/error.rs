//! Error type shared by every fallible engine operation.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::audio::format::AudioFormat;

/// Error type for decoding, mixing, registry and output operations.
#[derive(Debug)]
pub enum EngineError {
    /// The file could not be opened or recognized by the decoder.
    DecodeOpen { path: PathBuf, reason: String },
    /// Decoding failed after the file was opened.
    Decode(String),
    /// The channel layout cannot be converted to the mixer's layout.
    UnsupportedConversion { from: u16, to: u16 },
    /// The source's sample rate differs from the mixer's.
    FormatMismatch {
        expected: AudioFormat,
        actual: AudioFormat,
    },
    NameNotFound(String),
    DuplicateName(String),
    /// The output device could not be opened or started.
    Output(String),
    /// The engine has been shut down and no longer accepts sources.
    ShutDown,
    Settings(String),
    Io(std::io::Error),
}

impl EngineError {
    pub(crate) fn decode_open(path: &Path, reason: impl Display) -> Self {
        Self::DecodeOpen {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecodeOpen { path, reason } => {
                write!(f, "failed to open {}: {}", path.display(), reason)
            }
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::UnsupportedConversion { from, to } => write!(
                f,
                "unsupported channel conversion: {} -> {} channels",
                from, to
            ),
            Self::FormatMismatch { expected, actual } => write!(
                f,
                "format mismatch: mixer expects {}, source is {}",
                expected, actual
            ),
            Self::NameNotFound(name) => write!(f, "no cached sound named '{}'", name),
            Self::DuplicateName(name) => {
                write!(f, "a cached sound named '{}' is already registered", name)
            }
            Self::Output(err) => write!(f, "output error: {}", err),
            Self::ShutDown => write!(f, "engine has been shut down"),
            Self::Settings(err) => write!(f, "invalid settings: {}", err),
            Self::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Settings(value.to_string())
    }
}
