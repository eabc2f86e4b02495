//! Hardware-free output that pulls on a timer.

use log::info;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::EngineError;
use crate::mixer::MixerSource;

use super::{render_block, OutputSink, SharedVolume};

/// Pulls one block per block-duration on its own thread and discards it.
///
/// Used where no audio device exists (CI, servers) so that sources still
/// play out and retire in real time.
pub struct ClockedOutput {
    volume: SharedVolume,
    block_frames: usize,
    source: Option<MixerSource>,
    running: Arc<AtomicBool>,
    frames_rendered: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ClockedOutput {
    pub fn new(block_frames: usize) -> Self {
        Self {
            volume: SharedVolume::default(),
            block_frames: block_frames.max(1),
            source: None,
            running: Arc::new(AtomicBool::new(false)),
            frames_rendered: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Frames pulled from the mixer so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }
}

impl OutputSink for ClockedOutput {
    fn init(&mut self, source: MixerSource) -> Result<(), EngineError> {
        if self.handle.is_some() {
            return Err(EngineError::Output("output already started".to_string()));
        }
        self.source = Some(source);
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let mut source = self
            .source
            .take()
            .ok_or_else(|| EngineError::Output("output started before init".to_string()))?;
        let format = source.format();
        let block_frames = self.block_frames;
        let period = Duration::from_secs_f64(block_frames as f64 / format.sample_rate as f64);
        let volume = self.volume.clone();
        let running = self.running.clone();
        let frames_rendered = self.frames_rendered.clone();

        running.store(true, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name("clatter-clock".to_string())
            .spawn(move || {
                let mut block = vec![0.0_f32; format.frames_to_samples(block_frames)];
                let mut deadline = Instant::now();
                while running.load(Ordering::SeqCst) {
                    render_block(&mut source, &volume, &mut block);
                    frames_rendered.fetch_add(block_frames as u64, Ordering::Relaxed);

                    deadline += period;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        deadline = now;
                    }
                }
            })?;

        self.handle = Some(handle);
        info!("headless output started ({}, {} frame blocks)", format, block_frames);
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume.get()
    }

    fn set_volume(&self, volume: f32) {
        self.volume.set(volume);
    }

    fn dispose(&mut self) {
        self.source = None;
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            info!("headless output stopped");
        }
    }
}

impl Drop for ClockedOutput {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::format::AudioFormat;
    use crate::mixer::mixer;
    use crate::source::cached::{CachedSound, PlaybackCursor};

    #[test]
    fn plays_sources_out_in_real_time() {
        let format = AudioFormat::new(8_000, 1);
        let (handle, source) = mixer(format, 80, 4);
        let sound = Arc::new(CachedSound::from_samples(format, vec![0.1; 400]));
        handle.add(PlaybackCursor::new(sound).into()).unwrap();

        let mut output = ClockedOutput::new(80);
        output.init(source).unwrap();
        output.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.active_sources() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.active_sources(), 0);
        assert!(output.frames_rendered() >= 400);

        output.dispose();
        assert!(matches!(
            handle.add(PlaybackCursor::new(Arc::new(CachedSound::from_samples(format, vec![0.0; 4]))).into()),
            Err(EngineError::ShutDown)
        ));
    }

    #[test]
    fn start_without_init_fails() {
        let mut output = ClockedOutput::new(64);
        assert!(matches!(output.start(), Err(EngineError::Output(_))));
    }
}
