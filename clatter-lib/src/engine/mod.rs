//! Application-facing playback engine.

pub mod registry;
pub mod settings;

use log::{debug, info};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::format::AudioFormat;
use crate::decode::{AudioDecoder, FileDecoder, PrefetchDecoder};
use crate::error::EngineError;
use crate::mixer::{mixer, MixerHandle, MixerStats};
use crate::output::{ClockedOutput, DeviceOutput, OutputSink};
use crate::source::cached::{CachedSound, PlaybackCursor};
use crate::source::streaming::StreamingPlayback;

use registry::SoundRegistry;
use settings::{EngineSettings, OutputKind};

/// One mixer, one output sink and one sound registry.
///
/// Every method takes `&self`, so an engine can be shared across threads
/// behind an [`Arc`]. Engines are independent: a music engine and an effects
/// engine share no state.
pub struct AudioEngine {
    settings: EngineSettings,
    mixer: MixerHandle,
    output: Mutex<Option<Box<dyn OutputSink>>>,
    registry: SoundRegistry,
    shut_down: AtomicBool,
}

impl AudioEngine {
    /// Build an engine and start the output selected by `settings.output`.
    ///
    /// # Errors
    /// [`EngineError::Output`] if the output cannot be started.
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let settings = settings.sanitized();
        let output: Box<dyn OutputSink> = match settings.output {
            OutputKind::Device => Box::new(DeviceOutput::new(settings.block_frames)),
            OutputKind::Headless => Box::new(ClockedOutput::new(settings.block_frames)),
        };
        Self::with_output(settings, output)
    }

    /// Engine with the music preset.
    pub fn music() -> Result<Self, EngineError> {
        Self::new(EngineSettings::music())
    }

    /// Engine with the effects preset.
    pub fn effects() -> Result<Self, EngineError> {
        Self::new(EngineSettings::effects())
    }

    /// Build an engine around a caller-supplied output sink.
    pub fn with_output(
        settings: EngineSettings,
        mut output: Box<dyn OutputSink>,
    ) -> Result<Self, EngineError> {
        let settings = settings.sanitized();
        let format = settings.format();
        let (handle, source) = mixer(format, settings.block_frames, settings.max_sources);

        output.set_volume(settings.volume);
        output.init(source)?;
        output.start()?;
        info!("audio engine started ({})", format);

        Ok(Self {
            settings,
            mixer: handle,
            output: Mutex::new(Some(output)),
            registry: SoundRegistry::new(),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Decode `path` fully and store it under `name`.
    ///
    /// # Errors
    /// [`EngineError::DuplicateName`] if `name` is already registered (the
    /// file is not decoded), or the loader's error.
    pub fn register_cached_sound(
        &self,
        name: &str,
        path: impl AsRef<Path>,
    ) -> Result<(), EngineError> {
        self.ensure_running()?;
        if self.registry.contains(name) {
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        let path = path.as_ref();
        let sound = CachedSound::load(path)?;
        self.registry.insert(name, Arc::new(sound))?;
        info!("registered '{}' from {}", name, path.display());
        Ok(())
    }

    /// Start a new playback of a registered sound.
    pub fn play_cached(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_running()?;
        let sound = self.registry.get(name)?;
        self.play_sound(sound)
    }

    /// Start a new playback of an already loaded sound.
    pub fn play_sound(&self, sound: Arc<CachedSound>) -> Result<(), EngineError> {
        self.ensure_running()?;
        self.mixer.add(PlaybackCursor::new(sound).into())
    }

    /// Stream a file from disk.
    ///
    /// The file is opened and checked on the calling thread; decoding then
    /// continues on a prefetch thread so the output never waits on disk.
    ///
    /// # Errors
    /// [`EngineError::DecodeOpen`] if the file cannot be opened, or the
    /// mixer's format errors. Nothing is added on error.
    pub fn play_file(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        self.ensure_running()?;
        let path = path.as_ref();
        let decoder = FileDecoder::open(path)?;
        self.mixer.validate(decoder.format())?;

        let prefetch = PrefetchDecoder::spawn(Box::new(decoder), self.settings.stream_buffer_ms);
        self.play_decoder(Box::new(prefetch))?;
        debug!("streaming {}", path.display());
        Ok(())
    }

    /// Stream from an already opened decoder.
    ///
    /// The decoder is read on the output thread, so it must not block.
    pub fn play_decoder(&self, decoder: Box<dyn AudioDecoder>) -> Result<(), EngineError> {
        self.ensure_running()?;
        self.mixer.add(StreamingPlayback::new(decoder).into())
    }

    /// Current output volume. `0.0` once shut down.
    pub fn volume(&self) -> f32 {
        self.output_guard()
            .as_ref()
            .map(|output| output.volume())
            .unwrap_or(0.0)
    }

    /// Set the output volume, clamped to `0.0..=1.0`.
    pub fn set_volume(&self, volume: f32) {
        if let Some(output) = self.output_guard().as_ref() {
            output.set_volume(volume);
        }
    }

    /// Sources queued or playing.
    pub fn active_sources(&self) -> usize {
        self.mixer.active_sources()
    }

    pub fn stats(&self) -> MixerStats {
        self.mixer.stats()
    }

    pub fn format(&self) -> AudioFormat {
        self.mixer.format()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cached_sound(&self, name: &str) -> Result<Arc<CachedSound>, EngineError> {
        self.registry.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn sound_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop the output and drop every unfinished source.
    ///
    /// Safe to call more than once; later play requests fail with
    /// [`EngineError::ShutDown`].
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let output = self.output_guard().take();
        if let Some(mut output) = output {
            output.dispose();
        }
        self.registry.clear();
        info!("audio engine stopped ({})", self.mixer.format());
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.is_shut_down() {
            Err(EngineError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn output_guard(&self) -> MutexGuard<'_, Option<Box<dyn OutputSink>>> {
        self.output.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
