use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs;
use std::path::Path;

use crate::domain::metrics::ANALYTICS_TARGET;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "simulation.log";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sets up the global logger, once per process.
///
/// `RUST_LOG` picks the level (`info` when unset or unparsable). Records go to stderr in colour
/// and to `logs/simulation.log`. Per-frame analytics events stay out of the terminal; they reach
/// the file at `debug` level and below.
pub fn init() {
    let level = std::env::var("RUST_LOG").ok().and_then(|value| value.parse::<LevelFilter>().ok()).unwrap_or(LevelFilter::Info);
    let log_path = Path::new(LOG_DIR).join(LOG_FILE);

    let result = Dispatch::new()
        .level(level)
        .level_for("serde", LevelFilter::Warn)
        .chain(terminal_output())
        .chain(file_output(&log_path))
        .apply();

    match result {
        Ok(()) => log::info!("Logging at level {} to stderr and '{}'.", level, log_path.display()),
        Err(e) => eprintln!("Logger already set, keeping the existing one: {}", e),
    }
}

fn terminal_output() -> Dispatch {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    Dispatch::new()
        .filter(|metadata| metadata.target() != ANALYTICS_TARGET)
        .format(move |out, message, record| {
            out.finish(format_args!("[{} {} {}] {}", Local::now().format(TIMESTAMP_FORMAT), colors.color(record.level()), record.target(), message))
        })
        .chain(std::io::stderr())
}

/// Plain-text file output. Falls back to stderr when the file cannot be opened.
fn file_output(log_path: &Path) -> Dispatch {
    let dispatch = Dispatch::new().format(|out, message, record| {
        out.finish(format_args!("[{} {} {}] {}", Local::now().format(TIMESTAMP_FORMAT), record.level(), record.target(), message))
    });

    let opened = log_path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fern::log_file(log_path));

    match opened {
        Ok(file) => dispatch.chain(file),
        Err(e) => {
            eprintln!("Cannot write log file '{}', logging to stderr only: {}", log_path.display(), e);
            dispatch.chain(std::io::stderr())
        }
    }
}
