//! Stderr logger for command-line runs.
//!
//! Lines look like `[  0.012s  INFO colony_pick_core::plan] message`. The
//! module target is kept so a run over many plates can be grepped per stage.
//! Warnings (typically cells with fewer colonies than requested) are counted so
//! the caller can flag a plan that needs a second look.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct RunLogger {
    level: LevelFilter,
    started: Instant,
    warnings: AtomicUsize,
}

impl Log for RunLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Warn {
            self.warnings.fetch_add(1, Ordering::Relaxed);
        }
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<RunLogger> = OnceLock::new();

/// Install the run logger with the provided level filter.
///
/// Only the first call installs the logger; later calls keep the original
/// level and return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| RunLogger {
        level,
        started: Instant::now(),
        warnings: AtomicUsize::new(0),
    });
    log::set_logger(logger)?;
    log::set_max_level(level.max(LevelFilter::Warn));
    Ok(())
}

/// Warnings seen by the run logger since it was installed (0 if it is not).
pub fn warnings_logged() -> usize {
    LOGGER
        .get()
        .map_or(0, |l| l.warnings.load(Ordering::Relaxed))
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`, or by
/// `default_filter` (e.g. `"info"`) when the variable is unset.
///
/// Span close events carry timings for plate classification and detector calls.
/// `log` records from library code are forwarded to the subscriber.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
