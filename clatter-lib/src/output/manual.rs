//! Caller-driven output for tests and offline rendering.

use std::sync::{Arc, Mutex};

use crate::error::EngineError;
use crate::mixer::MixerSource;

use super::{render_block, OutputSink, SharedVolume};

#[derive(Default)]
struct ManualState {
    source: Option<MixerSource>,
    started: bool,
}

/// Output sink whose pulls are issued through a [`ManualClock`].
pub struct ManualOutput {
    volume: SharedVolume,
    state: Arc<Mutex<ManualState>>,
}

/// Pulls blocks on behalf of a [`ManualOutput`]; can be moved to any thread.
#[derive(Clone)]
pub struct ManualClock {
    volume: SharedVolume,
    state: Arc<Mutex<ManualState>>,
}

impl ManualOutput {
    /// Create the sink and the clock that drives it.
    pub fn new() -> (Self, ManualClock) {
        let volume = SharedVolume::default();
        let state = Arc::new(Mutex::new(ManualState::default()));
        let clock = ManualClock {
            volume: volume.clone(),
            state: state.clone(),
        };
        (Self { volume, state }, clock)
    }
}

impl ManualClock {
    /// Pull one block into `out`.
    ///
    /// Returns `false` (leaving `out` silent) before start or after dispose.
    pub fn render_into(&self, out: &mut [f32]) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !state.started {
            out.fill(0.0);
            return false;
        }
        match state.source.as_mut() {
            Some(source) => {
                render_block(source, &self.volume, out);
                true
            }
            None => {
                out.fill(0.0);
                false
            }
        }
    }

    /// Pull `frames` frames into a fresh buffer.
    pub fn render(&self, frames: usize) -> Option<Vec<f32>> {
        let channels = {
            let state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.source.as_ref()?.format().channels as usize
        };
        let mut block = vec![0.0_f32; frames * channels];
        self.render_into(&mut block).then_some(block)
    }
}

impl OutputSink for ManualOutput {
    fn init(&mut self, source: MixerSource) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.source = Some(source);
        state.started = false;
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.source.is_none() {
            return Err(EngineError::Output("output started before init".to_string()));
        }
        state.started = true;
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume.get()
    }

    fn set_volume(&self, volume: f32) {
        self.volume.set(volume);
    }

    fn dispose(&mut self) {
        let source = {
            let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state.started = false;
            state.source.take()
        };
        drop(source);
    }
}
