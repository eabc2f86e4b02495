use std::thread::sleep;
use std::time::{Duration, Instant};

use clap::ArgMatches;
use clatter_lib::{
    AudioEngine, CachedSound, EngineError, EngineSettings, EngineSettingsFile, OutputKind,
};
use log::{debug, info};

const IDLE_POLL: Duration = Duration::from_millis(20);

pub fn run(args: &ArgMatches) -> Result<i32, EngineError> {
    match args.subcommand() {
        Some(("play", sub)) => {
            let settings = engine_settings(args)?.music;
            play(settings, required(sub, "INPUT")?)
        }
        Some(("sfx", sub)) => {
            let settings = engine_settings(args)?.effects;
            sfx(settings, sub)
        }
        Some(("info", sub)) => info_command(required(sub, "INPUT")?),
        _ => Err(EngineError::Settings("no command given".to_string())),
    }
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a str, EngineError> {
    args.get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| EngineError::Settings(format!("missing {}", id)))
}

/// Resolve the settings document and apply command line overrides.
fn engine_settings(args: &ArgMatches) -> Result<EngineSettingsFile, EngineError> {
    let mut document = match args.get_one::<String>("settings") {
        Some(path) => EngineSettingsFile::from_json_file(path)?,
        None => EngineSettingsFile::default(),
    };

    for settings in [&mut document.music, &mut document.effects] {
        if let Some(volume) = args.get_one::<f32>("volume") {
            settings.volume = *volume;
        }
        if args.get_flag("headless") {
            settings.output = OutputKind::Headless;
        }
    }
    Ok(document)
}

fn play(settings: EngineSettings, input: &str) -> Result<i32, EngineError> {
    let engine = AudioEngine::new(settings)?;
    engine.play_file(input)?;
    info!("playing {} ({})", input, engine.format());

    wait_until_idle(&engine);
    engine.shutdown();
    Ok(0)
}

fn sfx(settings: EngineSettings, args: &ArgMatches) -> Result<i32, EngineError> {
    let engine = AudioEngine::new(settings)?;

    for entry in args.get_many::<String>("sound").into_iter().flatten() {
        let (name, path) = entry.split_once('=').ok_or_else(|| {
            EngineError::Settings(format!("expected NAME=PATH, got '{}'", entry))
        })?;
        engine.register_cached_sound(name, path)?;
    }

    let interval = Duration::from_millis(*args.get_one::<u64>("interval-ms").unwrap_or(&150));
    let triggers: Vec<&String> = args.get_many::<String>("trigger").into_iter().flatten().collect();
    for (index, name) in triggers.iter().enumerate() {
        engine.play_cached(name)?;
        debug!("triggered '{}' ({} active)", name, engine.active_sources());
        if index + 1 < triggers.len() {
            sleep(interval);
        }
    }

    wait_until_idle(&engine);
    let stats = engine.stats();
    info!("played {} sounds ({} blocks mixed)", stats.retired, stats.blocks);
    engine.shutdown();
    Ok(0)
}

fn info_command(input: &str) -> Result<i32, EngineError> {
    let sound = CachedSound::load(input)?;
    let format = sound.format();
    let frames = sound.len() / format.channels as usize;
    println!(
        "{}, {} frames, {:.3} s",
        format,
        frames,
        sound.duration().as_secs_f64()
    );
    Ok(0)
}

fn wait_until_idle(engine: &AudioEngine) {
    let started = Instant::now();
    while engine.active_sources() > 0 {
        sleep(IDLE_POLL);
    }
    debug!("engine idle after {:.2} s", started.elapsed().as_secs_f64());
}
