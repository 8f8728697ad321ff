//! Stderr logging for host and engine output.
//!
//! Host records print as `[  0.012s DEBUG qrean::session] ...`; records on
//! [`ENGINE_LOG_TARGET`] (the engine's own `debug` import) print with an
//! `engine>` tag and have a filter of their own, so a chatty engine build
//! can be silenced without losing host logs.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

/// Target used for messages the engine prints through its `debug` import.
pub const ENGINE_LOG_TARGET: &str = "qrean::engine";

struct SessionLogger {
    host: LevelFilter,
    engine: LevelFilter,
    started: Instant,
}

impl SessionLogger {
    fn filter_for(&self, target: &str) -> LevelFilter {
        if target == ENGINE_LOG_TARGET {
            self.engine
        } else {
            self.host
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let mut out = std::io::stderr().lock();
        let _ = if record.target() == ENGINE_LOG_TARGET {
            writeln!(out, "[{secs:8.3}s engine>] {}", record.args())
        } else {
            writeln!(
                out,
                "[{secs:8.3}s {:<5} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

/// Install the stderr logger with one filter for host and engine records.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init_with_levels(level, level)
}

/// Install the stderr logger with separate host and engine filters.
///
/// Only the first call installs anything; later calls keep the original
/// filters and return `Ok`.
pub fn init_with_levels(
    host: LevelFilter,
    engine: LevelFilter,
) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| SessionLogger {
        host,
        engine,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(host.max(engine));
    Ok(())
}

/// Install a `tracing` subscriber, ignoring an already installed one.
///
/// `RUST_LOG` overrides the default filter, which keeps engine output at
/// `warn`. With `json` set, events are flattened JSON lines.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let _ = try_init_tracing(json);
}

/// [`init_tracing`], reporting whether the subscriber was installed. `log`
/// records reach it through the subscriber's own `log` bridge.
#[cfg(feature = "tracing")]
pub fn try_init_tracing(json: bool) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{ENGINE_LOG_TARGET}=warn")));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);
    if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder.compact().finish().try_init()
    }
}
