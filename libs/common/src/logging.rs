//! Unified logging module for the VoltageEMS outstation
//!
//! Console output always uses the bracketed-level format. A daily rolling
//! file can be added; its non-blocking worker guard is held globally so the
//! writer lives for the rest of the process.

use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message fields`
///
/// Example output: `2025-12-02T00:50:44.809Z [INFO] Selection armed index=0 kind=AnalogOutputInt16`
pub struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Global guards for keeping file writers alive
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

// Dynamic log level reload support
type EnvFilterReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;
static LOG_FILTER_HANDLE: OnceLock<EnvFilterReloadHandle> = OnceLock::new();
static CURRENT_LOG_LEVEL: OnceLock<Mutex<String>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name, used as filter target and file prefix
    pub service_name: String,
    /// Default filter when `RUST_LOG` is not set (e.g. "info")
    pub level: String,
    /// Directory for the daily rolling file; console only when `None`
    pub log_dir: Option<PathBuf>,
    /// Enable JSON format for the file layer
    pub enable_json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "outstation".to_string(),
            level: "info".to_string(),
            log_dir: None,
            enable_json: false,
        }
    }
}

/// Build the filter directive used when `RUST_LOG` is absent
///
/// The service's own target is raised to debug unless the configured level
/// is already more verbose.
pub fn default_filter(config: &LogConfig) -> String {
    let level = config.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "debug" | "trace" => level,
        _ => format!("{},{}=debug", level, config.service_name.replace('-', "_")),
    }
}

/// Initialize logging system with configuration
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Respect RUST_LOG when present
    let filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter(&config));
    let env_filter = EnvFilter::try_new(&filter_str)?;

    let (reload_filter, reload_handle) = reload::Layer::new(env_filter);
    let _ = LOG_FILTER_HANDLE.set(reload_handle);
    let _ = CURRENT_LOG_LEVEL.set(Mutex::new(filter_str));

    let console_layer = fmt::layer()
        .with_ansi(true)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
            match guards.lock() {
                Ok(mut guards) => guards.push(guard),
                Err(poisoned) => poisoned.into_inner().push(guard),
            }

            let layer = if config.enable_json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_level(true)
                    .with_target(true)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed()
            };
            Some(layer)
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(reload_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        log_dir = ?config.log_dir,
        "Logging initialized"
    );
    Ok(())
}

/// Shorthand: console logging at `level`
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_config(LogConfig {
        level: level.to_string(),
        ..Default::default()
    })
}

/// Dynamically set log filter level at runtime
///
/// # Example
/// ```ignore
/// common::logging::set_log_level("info,outstation=trace")?;
/// ```
pub fn set_log_level(level: &str) -> Result<(), String> {
    let handle = LOG_FILTER_HANDLE
        .get()
        .ok_or("Logging not initialized with reload support")?;

    let new_filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    handle
        .reload(new_filter)
        .map_err(|e| format!("Failed to reload log filter: {}", e))?;

    if let Some(current) = CURRENT_LOG_LEVEL.get() {
        if let Ok(mut slot) = current.lock() {
            *slot = level.to_string();
        }
    }
    tracing::info!("Log level changed to {}", level);
    Ok(())
}

/// Current log filter directive
pub fn get_log_level() -> String {
    CURRENT_LOG_LEVEL
        .get()
        .and_then(|m| m.lock().ok().map(|s| s.clone()))
        .unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl MakeWriter<'_> for Capture {
        type Writer = Capture;

        fn make_writer(&self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_format_level() {
        assert_eq!(format_level(&Level::INFO), "[INFO]");
        assert_eq!(format_level(&Level::ERROR), "[ERROR]");
    }

    #[test]
    fn test_default_filter() {
        let config = LogConfig::default();
        assert_eq!(default_filter(&config), "info,outstation=debug");

        let config = LogConfig {
            level: "TRACE".to_string(),
            ..Default::default()
        };
        assert_eq!(default_filter(&config), "trace");
    }

    #[test]
    fn test_bracketed_format_writes_fields() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(capture.clone())
                .with_ansi(false)
                .event_format(BracketedLevelFormat),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(index = 3, "Selection rejected");
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("[WARN] Selection rejected index=3"));
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn test_get_log_level_before_init() {
        // Not initialized in unit tests: falls back to "info"
        if LOG_FILTER_HANDLE.get().is_none() {
            assert_eq!(get_log_level(), "info");
            assert!(set_log_level("debug").is_err());
        }
    }
}
