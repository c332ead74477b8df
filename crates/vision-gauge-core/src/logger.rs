//! Minimal logging backend.
//!
//! Prints `LEVEL elapsed target: message` to stderr. Install once at startup
//! with [`init_with_level`]; later calls are no-ops.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct UptimeLogger {
    level: LevelFilter,
    started: Instant,
}

impl UptimeLogger {
    fn render(&self, record: &Record) -> String {
        let uptime = self.started.elapsed().as_secs_f64();
        format!(
            "{:<5} +{:.3}s {}: {}",
            record.level(),
            uptime,
            record.target(),
            record.args()
        )
    }
}

impl Log for UptimeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // one write per record so concurrent lines do not interleave
        let line = self.render(record);
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<UptimeLogger> = OnceLock::new();

/// Install the uptime-stamped stderr logger with the provided level filter.
///
/// The first call wins; repeated calls keep the original filter and return
/// `Ok`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut installed = false;
    let logger = LOGGER.get_or_init(|| {
        installed = true;
        UptimeLogger {
            level,
            started: Instant::now(),
        }
    });
    if installed {
        log::set_logger(logger)?;
        log::set_max_level(logger.level);
    }
    Ok(())
}

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
            .compact()
            .finish()
            .try_init();
    }
}
