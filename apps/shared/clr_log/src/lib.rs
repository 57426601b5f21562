//! Centralized logging for the CLR resource host
//!
//! Provides a custom formatter for tracing that:
//! - Formats thread IDs as #N instead of ThreadId(N)
//! - Extracts `runtime_type` and `resource` fields to display as `clr::resource-name`
//! - Strips the application prefix from targets for cleaner output
//! - Filters external dependency logs based on the `CLR_LOGDEPS` environment variable
//!
//! # Environment Variables
//!
//! - `CLR_LOGDEPS`: Set to `1` to enable logging from external dependencies.
//!   Default is `0` which only shows logs from the host crates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clr_log::{init_logging, LogConfig};
//! use tracing::Level;
//!
//! let config = LogConfig::new("clr_server::").with_level(Level::INFO);
//! init_logging(config)?;
//! ```

use std::fmt as std_fmt;
use std::io::Write;
use tracing::Level;
use tracing::field::Field;
use tracing_subscriber::field::Visit;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Crates whose logs are shown when dependency logging is disabled
const OWN_TARGETS: &[&str] = &["clr_server", "clr_host", "clr_log"];

/// Field extractor for runtime_type, resource, and message fields
///
/// Resource-scoped events carry `runtime_type = "clr"` and `resource = <name>`;
/// the formatter renders them as `clr::<name>: message`.
#[derive(Default)]
pub struct FieldExtractor {
    pub runtime_type: Option<String>,
    pub resource: Option<String>,
    pub message: Option<String>,
}

impl FieldExtractor {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "runtime_type" => self.runtime_type = Some(value),
            "resource" => self.resource = Some(value),
            "message" => self.message = Some(value),
            _ => {}
        }
    }
}

impl Visit for FieldExtractor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std_fmt::Debug) {
        self.store(field, format!("{:?}", value).trim_matches('"').to_string());
    }
}

/// Custom event formatter for the host applications
pub struct CustomFormatter<T> {
    timer: T,
    ansi: bool,
    /// Prefix to strip from log targets (e.g., "clr_server::")
    strip_prefix: Option<String>,
}

impl<T> CustomFormatter<T> {
    pub fn new(timer: T, ansi: bool) -> Self {
        Self {
            timer,
            ansi,
            strip_prefix: None,
        }
    }

    /// Set the prefix to strip from log targets
    pub fn with_strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefix = Some(prefix.into());
        self
    }

    /// Target as it should be displayed, or `None` when it should be hidden
    fn display_target<'a>(&self, target: &'a str) -> Option<&'a str> {
        let Some(prefix) = &self.strip_prefix else {
            return Some(target);
        };
        let app_name = prefix.trim_end_matches("::");
        if target == app_name {
            return None;
        }
        Some(target.strip_prefix(prefix.as_str()).unwrap_or(target))
    }
}

impl<T: Clone> Clone for CustomFormatter<T> {
    fn clone(&self) -> Self {
        Self {
            timer: self.timer.clone(),
            ansi: self.ansi,
            strip_prefix: self.strip_prefix.clone(),
        }
    }
}

impl<S, N, T> FormatEvent<S, N> for CustomFormatter<T>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    T: fmt::time::FormatTime,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std_fmt::Result {
        let metadata = event.metadata();

        let (dim_start, dim_end) = if self.ansi {
            ("\x1b[2m", "\x1b[0m")
        } else {
            ("", "")
        };
        let (level_color, level_str) = match *metadata.level() {
            Level::ERROR => (if self.ansi { "\x1b[31m" } else { "" }, "ERROR"),
            Level::WARN => (if self.ansi { "\x1b[33m" } else { "" }, " WARN"),
            Level::INFO => (if self.ansi { "\x1b[32m" } else { "" }, " INFO"),
            Level::DEBUG => (if self.ansi { "\x1b[34m" } else { "" }, "DEBUG"),
            Level::TRACE => (if self.ansi { "\x1b[35m" } else { "" }, "TRACE"),
        };
        let color_end = if self.ansi { "\x1b[0m" } else { "" };

        write!(writer, "{}", dim_start)?;
        self.timer.format_time(&mut writer)?;
        write!(writer, "{} ", dim_end)?;

        write!(writer, "{}{}{} ", level_color, level_str, color_end)?;

        let thread_id = format!("{:?}", std::thread::current().id());
        if let Some(num) = thread_id
            .strip_prefix("ThreadId(")
            .and_then(|s| s.strip_suffix(")"))
            .and_then(|s| s.parse::<u64>().ok())
        {
            write!(writer, "#{:03} ", num)?;
        }

        let mut extractor = FieldExtractor::default();
        event.record(&mut extractor);

        if let (Some(rt), Some(resource)) = (&extractor.runtime_type, &extractor.resource) {
            write!(writer, "{}{}::{}{}: ", dim_start, rt, resource, dim_end)?;
            if let Some(msg) = &extractor.message {
                write!(writer, "{}", msg)?;
            }
        } else {
            if let Some(target) = self.display_target(metadata.target()) {
                if !target.is_empty() {
                    write!(writer, "{}{}{}: ", dim_start, target, dim_end)?;
                }
            }
            ctx.field_format().format_fields(writer.by_ref(), event)?;
        }

        writeln!(writer)
    }
}

/// Create a timer with the host's log format
///
/// Uses format: `[year]/[month]/[day] [hour]:[minute]:[second].[subsecond digits:4]`
/// and falls back to UTC if the local offset cannot be determined.
pub fn create_custom_timer()
-> OffsetTime<&'static [time::format_description::BorrowedFormatItem<'static>]> {
    use time::macros::format_description;

    let format =
        format_description!("[year]/[month]/[day] [hour]:[minute]:[second].[subsecond digits:4]");
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    OffsetTime::new(offset, format)
}

/// Check if dependency logging is enabled via CLR_LOGDEPS environment variable
pub fn is_dependency_logging_enabled() -> bool {
    std::env::var("CLR_LOGDEPS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Build the filter directive for the given level
///
/// Without dependency logging only the host crates are shown; everything else
/// is turned off.
pub fn build_filter_directives(level: Level, log_deps: bool) -> String {
    let level_str = level_name(level);

    if log_deps {
        return level_str.to_string();
    }

    let mut directives = String::from("off");
    for target in OWN_TARGETS {
        directives.push_str(&format!(",{}={}", target, level_str));
    }
    directives
}

/// Parse a configured level name (trace, debug, info, warn, error)
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Detect if ANSI colors should be used based on environment
///
/// Disables ANSI colors if stdout is not a TTY, `NO_COLOR` is set
/// (https://no-color.org/) or `TERM=dumb`.
pub fn should_use_ansi() -> bool {
    atty::is(atty::Stream::Stdout)
        && std::env::var("NO_COLOR").is_err()
        && std::env::var("TERM").map(|t| t != "dumb").unwrap_or(true)
}

/// Logging configuration
pub struct LogConfig<W: Write + Send + 'static = std::fs::File> {
    /// Prefix to strip from log targets (e.g., "clr_server::")
    pub strip_prefix: String,
    /// Whether to use ANSI color codes (auto-detected if None)
    pub use_ansi: Option<bool>,
    /// Minimum log level
    pub level: Level,
    /// Optional file to write logs to
    pub log_file: Option<W>,
}

impl<W: Write + Send + 'static> LogConfig<W> {
    pub fn new(strip_prefix: impl Into<String>) -> Self {
        Self {
            strip_prefix: strip_prefix.into(),
            use_ansi: None,
            level: Level::INFO,
            log_file: None,
        }
    }

    pub fn with_ansi(mut self, use_ansi: bool) -> Self {
        self.use_ansi = Some(use_ansi);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_log_file(mut self, file: W) -> Self {
        self.log_file = Some(file);
        self
    }
}

/// Initialize logging with the given configuration
///
/// `RUST_LOG` overrides the default filter directives.
pub fn init_logging<W: Write + Send + 'static>(
    config: LogConfig<W>,
) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::EnvFilter;

    let timer = create_custom_timer();
    let use_ansi = config.use_ansi.unwrap_or_else(should_use_ansi);
    let filter_directives = build_filter_directives(config.level, is_dependency_logging_enabled());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&filter_directives));

    let formatter_stdout =
        CustomFormatter::new(timer.clone(), use_ansi).with_strip_prefix(&config.strip_prefix);
    let stdout_layer = tracing_subscriber::fmt::layer()
        .event_format(formatter_stdout)
        .with_ansi(use_ansi)
        .with_writer(std::io::stdout);

    let file_layer = config.log_file.map(|file| {
        let formatter_file =
            CustomFormatter::new(timer, false).with_strip_prefix(&config.strip_prefix);
        tracing_subscriber::fmt::layer()
            .event_format(formatter_file)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}
