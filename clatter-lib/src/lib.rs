//! # Clatter Audio Library
//!
//! Real-time mixing for interactive applications: short sound effects are
//! decoded once and cached in memory, longer music is streamed from disk, and
//! everything is summed by a [`mixer`] that an output device pulls from on its
//! own thread.
//!
//! Application code talks to an [`AudioEngine`]. Two engines are typically
//! created side by side, one for music and one for effects:
//!
//! ```no_run
//! use clatter_lib::{AudioEngine, EngineSettings};
//!
//! # fn main() -> Result<(), clatter_lib::EngineError> {
//! let music = AudioEngine::new(EngineSettings::music())?;
//! let effects = AudioEngine::new(EngineSettings::effects())?;
//!
//! effects.register_cached_sound("shoot_laser", "assets/shoot_laser.wav")?;
//! music.play_file("assets/song_main.ogg")?;
//! effects.play_cached("shoot_laser")?;
//!
//! effects.shutdown();
//! music.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod constants;
pub mod decode;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod output;
pub mod source;

pub use audio::format::AudioFormat;
pub use engine::settings::{EngineSettings, EngineSettingsFile, OutputKind};
pub use engine::AudioEngine;
pub use error::EngineError;
pub use source::cached::{CachedSound, PlaybackCursor};
pub use source::{PlaybackSource, SampleSource};
