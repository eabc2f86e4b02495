use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clatter_lib::output::{ManualClock, ManualOutput};
use clatter_lib::{AudioEngine, EngineError, EngineSettings};

const BLOCK_FRAMES: usize = 512;

fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, value: f32) -> PathBuf {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let sample = (value * 32_768.0) as i16;
    for _ in 0..frames * channels as usize {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
    path.to_path_buf()
}

fn engine(sample_rate: u32, channels: u16) -> (AudioEngine, ManualClock) {
    let settings = EngineSettings {
        sample_rate,
        channels,
        block_frames: BLOCK_FRAMES,
        ..EngineSettings::default()
    };
    let (output, clock) = ManualOutput::new();
    let engine = AudioEngine::with_output(settings, Box::new(output)).unwrap();
    (engine, clock)
}

#[test]
fn overlapping_beeps_retire_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let beep = write_wav(&dir.path().join("beep.wav"), 44_100, 1, 22_050, 0.25);
    let (engine, clock) = engine(44_100, 1);
    engine.register_cached_sound("beep", &beep).unwrap();

    engine.play_cached("beep").unwrap();
    let mut pulled = 0;
    for _ in 0..10 {
        let block = clock.render(BLOCK_FRAMES).unwrap();
        assert!(block.iter().all(|sample| *sample == 0.25));
        pulled += BLOCK_FRAMES;
    }

    engine.play_cached("beep").unwrap();
    assert_eq!(engine.active_sources(), 2);
    let overlap = clock.render(BLOCK_FRAMES).unwrap();
    assert!(overlap.iter().all(|sample| *sample == 0.5));
    pulled += BLOCK_FRAMES;

    while engine.active_sources() == 2 {
        clock.render(BLOCK_FRAMES).unwrap();
        pulled += BLOCK_FRAMES;
    }
    assert_eq!(engine.active_sources(), 1);
    // Retired on the pull after its final partial block.
    assert!(
        pulled >= 22_050 + BLOCK_FRAMES && pulled <= 22_050 + 2 * BLOCK_FRAMES,
        "first beep retired after {} frames",
        pulled
    );

    let started_second = 10 * BLOCK_FRAMES;
    while engine.active_sources() == 1 {
        clock.render(BLOCK_FRAMES).unwrap();
        pulled += BLOCK_FRAMES;
    }
    assert_eq!(engine.active_sources(), 0);
    let second_span = pulled - started_second;
    assert!(second_span >= 22_050 + BLOCK_FRAMES && second_span <= 22_050 + 2 * BLOCK_FRAMES);

    let silence = clock.render(BLOCK_FRAMES).unwrap();
    assert!(silence.iter().all(|sample| *sample == 0.0));
    assert_eq!(engine.stats().retired, 2);
}

#[test]
fn missing_file_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, clock) = engine(48_000, 2);

    let err = engine
        .play_file(dir.path().join("song_main.ogg"))
        .err()
        .expect("missing file must fail");
    assert!(matches!(err, EngineError::DecodeOpen { .. }));
    assert_eq!(engine.active_sources(), 0);
    assert_eq!(engine.stats().added, 0);

    let block = clock.render(BLOCK_FRAMES).unwrap();
    assert!(block.iter().all(|sample| *sample == 0.0));
}

#[test]
fn concurrent_plays_are_never_lost() {
    const PRODUCERS: usize = 50;

    let dir = tempfile::tempdir().unwrap();
    let click = write_wav(&dir.path().join("click.wav"), 22_050, 1, 300, 0.01);
    let (engine, clock) = engine(22_050, 1);
    engine.register_cached_sound("click", &click).unwrap();
    let engine = Arc::new(engine);

    let done = Arc::new(AtomicBool::new(false));
    let max_active = Arc::new(AtomicUsize::new(0));
    let consumer = {
        let engine = engine.clone();
        let clock = clock.clone();
        let done = done.clone();
        let max_active = max_active.clone();
        thread::spawn(move || {
            let mut block = vec![0.0_f32; BLOCK_FRAMES];
            while !done.load(Ordering::SeqCst) {
                assert!(clock.render_into(&mut block));
                max_active.fetch_max(engine.active_sources(), Ordering::SeqCst);
            }
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || engine.play_cached("click"))
        })
        .collect();
    for producer in producers {
        producer.join().unwrap().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    consumer.join().unwrap();

    for _ in 0..1_000 {
        if engine.active_sources() == 0 {
            break;
        }
        clock.render(BLOCK_FRAMES).unwrap();
    }

    let stats = engine.stats();
    assert!(max_active.load(Ordering::SeqCst) <= PRODUCERS);
    assert_eq!(stats.added, PRODUCERS as u64);
    assert_eq!(stats.retired, PRODUCERS as u64);
    assert_eq!(stats.active, 0);
}

#[test]
fn loading_twice_yields_identical_buffers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jump.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22_050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..30_000_i32 {
        writer.write_sample(((i * 37) % 20_000 - 10_000) as i16).unwrap();
    }
    writer.finalize().unwrap();

    let (engine, _clock) = engine(22_050, 1);
    engine.register_cached_sound("first", &path).unwrap();
    engine.register_cached_sound("second", &path).unwrap();

    let first = engine.cached_sound("first").unwrap();
    let second = engine.cached_sound("second").unwrap();
    assert_eq!(first.len(), 30_000);
    assert_eq!(first.samples(), second.samples());
    assert_eq!(engine.sound_names(), vec!["first".to_string(), "second".to_string()]);
}

#[test]
fn streamed_file_plays_every_sample_then_retires() {
    let dir = tempfile::tempdir().unwrap();
    let song = write_wav(&dir.path().join("song.wav"), 44_100, 1, 11_025, 0.25);
    let (engine, clock) = engine(44_100, 2);

    engine.play_file(&song).unwrap();
    assert_eq!(engine.active_sources(), 1);

    let mut audible = 0;
    let deadline = Instant::now() + Duration::from_secs(10);
    while engine.active_sources() > 0 {
        assert!(Instant::now() < deadline, "stream never finished");
        let block = clock.render(BLOCK_FRAMES).unwrap();
        audible += block.iter().filter(|sample| **sample == 0.25).count();
        thread::sleep(Duration::from_millis(1));
    }

    // Mono upmixed to stereo: every input sample lands twice.
    assert_eq!(audible, 2 * 11_025);
    assert_eq!(engine.stats().retired, 1);
}

#[test]
fn sample_rate_mismatch_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let song = write_wav(&dir.path().join("ambient.wav"), 22_050, 2, 1_000, 0.1);
    let (engine, _clock) = engine(48_000, 2);

    let err = engine.play_file(&song).err().expect("rate mismatch must fail");
    match err {
        EngineError::FormatMismatch { expected, actual } => {
            assert_eq!(expected.sample_rate, 48_000);
            assert_eq!(actual.sample_rate, 22_050);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(engine.stats().added, 0);
}

#[test]
fn stereo_sound_on_mono_engine_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let wide = write_wav(&dir.path().join("wide.wav"), 22_050, 2, 500, 0.1);
    let (engine, _clock) = engine(22_050, 1);
    engine.register_cached_sound("wide", &wide).unwrap();

    let err = engine.play_cached("wide").err().unwrap();
    assert!(matches!(err, EngineError::UnsupportedConversion { from: 2, to: 1 }));
    assert_eq!(engine.active_sources(), 0);
}

#[test]
fn registry_errors_are_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let coin = write_wav(&dir.path().join("coin.wav"), 22_050, 1, 200, 0.1);
    let (engine, _clock) = engine(22_050, 1);

    assert!(matches!(engine.play_cached("coin"), Err(EngineError::NameNotFound(_))));
    engine.register_cached_sound("coin", &coin).unwrap();
    assert!(matches!(
        engine.register_cached_sound("coin", &coin),
        Err(EngineError::DuplicateName(_))
    ));
    assert!(matches!(
        engine.register_cached_sound("ghost", dir.path().join("ghost.wav")),
        Err(EngineError::DecodeOpen { .. })
    ));
    assert!(!engine.is_registered("ghost"));
    engine.play_cached("coin").unwrap();
    assert_eq!(engine.active_sources(), 1);
}

#[test]
fn shutdown_drops_streams_and_rejects_new_plays() {
    let dir = tempfile::tempdir().unwrap();
    let song = write_wav(&dir.path().join("long.wav"), 44_100, 2, 44_100, 0.2);
    let (engine, clock) = engine(44_100, 2);

    engine.play_file(&song).unwrap();
    clock.render(BLOCK_FRAMES).unwrap();
    assert_eq!(engine.active_sources(), 1);

    engine.shutdown();
    assert_eq!(engine.active_sources(), 0);
    assert!(clock.render(BLOCK_FRAMES).is_none());
    assert!(matches!(engine.play_file(&song), Err(EngineError::ShutDown)));
}

#[test]
fn music_and_effects_engines_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let laser = write_wav(&dir.path().join("laser.wav"), 22_050, 1, 100, 0.3);

    let (music_out, _music_clock) = ManualOutput::new();
    let (effects_out, effects_clock) = ManualOutput::new();
    let music = AudioEngine::with_output(EngineSettings::music(), Box::new(music_out)).unwrap();
    let effects = AudioEngine::with_output(EngineSettings::effects(), Box::new(effects_out)).unwrap();

    effects.register_cached_sound("shoot_laser", &laser).unwrap();
    assert!(!music.is_registered("shoot_laser"));
    assert!(matches!(music.play_cached("shoot_laser"), Err(EngineError::NameNotFound(_))));

    effects.play_cached("shoot_laser").unwrap();
    music.set_volume(0.2);
    assert_eq!(effects.volume(), 1.0);
    assert_eq!(music.active_sources(), 0);

    let block = effects_clock.render(128).unwrap();
    assert!((block[0] - 0.3).abs() < 1e-3);
}
