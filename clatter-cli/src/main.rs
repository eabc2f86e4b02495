//! # Clatter
//!
//! Command line front end for the clatter mixing engine.

use log::error;

mod cli;
mod logging;
mod runner;

const FAILURE_LOG_LINES: usize = 20;

fn main() {
    let args = cli::args::build_cli().get_matches();
    let log_buffer = logging::init(args.get_flag("debug"));

    let code = match runner::run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            if !args.get_flag("debug") {
                let lines = logging::snapshot(&log_buffer);
                let start = lines.len().saturating_sub(FAILURE_LOG_LINES);
                for line in lines[start..].iter().filter(|line| line.starts_with("[DEBUG]")) {
                    eprintln!("{}", line);
                }
            }
            -1
        }
    };

    std::process::exit(code)
}
