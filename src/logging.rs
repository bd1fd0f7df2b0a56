//! Minimal stderr backend for the `log` facade.
//!
//! The level comes from `GRIDCALC_LOG` (`error`..`trace`, `off`) when set,
//! otherwise from the number of `-v` flags.

use std::io::Write;

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

pub fn level_for(verbosity: u8, env: Option<&str>) -> LevelFilter {
    if let Some(level) = env.and_then(|s| s.trim().parse::<LevelFilter>().ok()) {
        return level;
    }
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the logger. Safe to call more than once; later calls only
/// adjust the level.
pub fn init(verbosity: u8) {
    let env = std::env::var("GRIDCALC_LOG").ok();
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_for(verbosity, env.as_deref()));
}
