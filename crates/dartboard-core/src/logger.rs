//! Stderr logger for the `log` facade.
//!
//! Lines look like `[  0.012s DEBUG dartboard_calib] message`. Install it once
//! with [`init_with_level`], or let [`init_from_env`] read the level from the
//! `DARTBOARD_LOG` environment variable.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted by [`init_from_env`].
pub const LOG_ENV: &str = "DARTBOARD_LOG";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install the stderr logger using `DARTBOARD_LOG` (`error`..`trace`, `off`),
/// falling back to `default` when the variable is unset or unparsable.
pub fn init_from_env(default: LevelFilter) -> Result<(), log::SetLoggerError> {
    init_with_level(level_from(std::env::var(LOG_ENV).ok().as_deref(), default))
}

fn level_from(raw: Option<&str>, default: LevelFilter) -> LevelFilter {
    raw.and_then(|raw| LevelFilter::from_str(raw.trim()).ok())
        .unwrap_or(default)
}

/// Install a `tracing` subscriber honouring `RUST_LOG`, with span close events
/// so the instrumented pipeline stages report their timings.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_level_parsing() {
        assert_eq!(level_from(Some("debug"), LevelFilter::Warn), LevelFilter::Debug);
        assert_eq!(level_from(Some(" TRACE\n"), LevelFilter::Warn), LevelFilter::Trace);
        assert_eq!(level_from(Some("off"), LevelFilter::Info), LevelFilter::Off);
        assert_eq!(level_from(Some("loud"), LevelFilter::Info), LevelFilter::Info);
        assert_eq!(level_from(None, LevelFilter::Error), LevelFilter::Error);
    }

    #[test]
    fn init_from_env_installs_once() {
        std::env::set_var(LOG_ENV, "debug");
        init_from_env(LevelFilter::Warn).unwrap();
        assert_eq!(log::max_level(), LevelFilter::Debug);
        assert!(log::log_enabled!(log::Level::Debug));

        // A second install keeps the first logger.
        init_with_level(LevelFilter::Error).unwrap();
        assert_eq!(log::max_level(), LevelFilter::Debug);
    }
}
