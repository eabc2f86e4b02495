//! CLI argument definitions for `clatter`.

use clap::{value_parser, Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("clatter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Play music and sound effects through the clatter mixer")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("settings")
                .long("settings")
                .short('S')
                .value_name("PATH")
                .global(true)
                .help("JSON file with \"music\" and \"effects\" engine settings"),
        )
        .arg(
            Arg::new("volume")
                .long("volume")
                .short('v')
                .value_name("VOLUME")
                .value_parser(value_parser!(f32))
                .global(true)
                .help("Output volume (0.0-1.0)"),
        )
        .arg(
            Arg::new("headless")
                .long("headless")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Mix on a timer thread instead of the audio device"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .short('d')
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Show debug output"),
        )
        .subcommand(
            Command::new("play")
                .about("Stream a file through the music engine until it ends")
                .arg(
                    Arg::new("INPUT")
                        .help("The input file path")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("sfx")
                .about("Register sound effects and trigger them in order")
                .arg(
                    Arg::new("sound")
                        .long("sound")
                        .short('s')
                        .value_name("NAME=PATH")
                        .action(ArgAction::Append)
                        .required(true)
                        .help("Register a cached sound (repeatable)"),
                )
                .arg(
                    Arg::new("trigger")
                        .long("trigger")
                        .short('t')
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Play a registered sound (repeatable, in order)"),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .value_name("MS")
                        .value_parser(value_parser!(u64))
                        .default_value("150")
                        .help("Delay between triggers"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Decode a file fully and print its format and length")
                .arg(
                    Arg::new("INPUT")
                        .help("The input file path")
                        .required(true)
                        .index(1),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn sfx_collects_repeated_sounds_and_triggers() {
        let matches = build_cli()
            .try_get_matches_from([
                "clatter", "--headless", "sfx", "-s", "jump=jump.wav", "-s", "coin=coin.wav", "-t",
                "coin", "-t", "jump",
            ])
            .unwrap();
        assert!(matches.get_flag("headless"));
        let (name, sfx) = matches.subcommand().unwrap();
        assert_eq!(name, "sfx");
        let sounds: Vec<&String> = sfx.get_many::<String>("sound").unwrap().collect();
        assert_eq!(sounds, ["jump=jump.wav", "coin=coin.wav"]);
        let triggers: Vec<&String> = sfx.get_many::<String>("trigger").unwrap().collect();
        assert_eq!(triggers, ["coin", "jump"]);
        assert_eq!(sfx.get_one::<u64>("interval-ms"), Some(&150));
    }
}
