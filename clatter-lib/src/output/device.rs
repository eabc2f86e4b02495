//! Default-device output through rodio.

use log::{debug, error, info, warn};
use rodio::{OutputStreamBuilder, Sink};
use std::fmt;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::EngineError;
use crate::mixer::MixerSource;

use super::{OutputSink, OutputStage, SharedVolume};

const OPEN_ATTEMPTS: usize = 10;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Output sink that plays through the system's default audio device.
///
/// The rodio stream lives on a dedicated thread for its whole lifetime; the
/// device callback pulls [`OutputStage`] samples from there.
pub struct DeviceOutput {
    volume: SharedVolume,
    block_frames: usize,
    source: Option<MixerSource>,
    worker: Option<DeviceWorker>,
}

struct DeviceWorker {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl DeviceOutput {
    pub fn new(block_frames: usize) -> Self {
        Self {
            volume: SharedVolume::default(),
            block_frames,
            source: None,
            worker: None,
        }
    }
}

impl OutputSink for DeviceOutput {
    fn init(&mut self, source: MixerSource) -> Result<(), EngineError> {
        if self.worker.is_some() {
            return Err(EngineError::Output("output already started".to_string()));
        }
        self.source = Some(source);
        Ok(())
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let source = self
            .source
            .take()
            .ok_or_else(|| EngineError::Output("output started before init".to_string()))?;
        let stage = OutputStage::new(source, self.volume.clone(), self.block_frames);

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("clatter-output".to_string())
            .spawn(move || {
                let opened = open_with_retry(
                    OPEN_ATTEMPTS,
                    OPEN_RETRY_DELAY,
                    OutputStreamBuilder::open_default_stream,
                );
                let stream = match opened {
                    Ok(stream) => stream,
                    Err(reason) => {
                        warn!("{}", reason);
                        let _ = ready_tx.send(Err(reason));
                        return;
                    }
                };
                let sink = Sink::connect_new(stream.mixer());
                sink.append(stage);
                sink.play();
                let _ = ready_tx.send(Ok(()));

                // Either an explicit stop or the owner going away ends playback.
                let _ = stop_rx.recv();
                sink.stop();
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("output device started");
                self.worker = Some(DeviceWorker {
                    stop: stop_tx,
                    handle,
                });
                Ok(())
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(EngineError::Output(err))
            }
            Err(_) => {
                let _ = handle.join();
                Err(EngineError::Output("output thread exited early".to_string()))
            }
        }
    }

    fn volume(&self) -> f32 {
        self.volume.get()
    }

    fn set_volume(&self, volume: f32) {
        self.volume.set(volume);
    }

    fn dispose(&mut self) {
        self.source = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop.send(());
            if worker.handle.join().is_err() {
                error!("output thread panicked");
            }
            info!("output device stopped");
        }
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Call `open` up to `attempts` times, sleeping `delay` after each failure.
///
/// Devices can be briefly busy right after another stream closes, so one
/// failure is not final. The error names the last failure seen.
fn open_with_retry<T, E: fmt::Display>(
    attempts: usize,
    delay: Duration,
    mut open: impl FnMut() -> Result<T, E>,
) -> Result<T, String> {
    let mut last = String::from("never attempted");
    for attempt in 1..=attempts {
        match open() {
            Ok(opened) => return Ok(opened),
            Err(err) => {
                last = err.to_string();
                debug!("output device attempt {} of {}: {}", attempt, attempts, last);
                if attempt < attempts {
                    thread::sleep(delay);
                }
            }
        }
    }
    Err(format!("no output device after {} attempts: {}", attempts, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retries_until_the_device_opens() {
        let calls = Cell::new(0);
        let opened = open_with_retry(5, Duration::ZERO, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("device busy")
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(opened, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_with_the_last_error() {
        let calls = Cell::new(0);
        let err = open_with_retry(3, Duration::ZERO, || -> Result<(), String> {
            calls.set(calls.get() + 1);
            Err(format!("busy #{}", calls.get()))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 3);
        assert_eq!(err, "no output device after 3 attempts: busy #3");
    }

    #[test]
    fn start_without_init_is_an_error() {
        let mut output = DeviceOutput::new(256);
        assert!(matches!(output.start(), Err(EngineError::Output(_))));
    }
}
