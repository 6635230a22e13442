//! Multitenancy Logging
//!
//! Structured, environment-controlled logging shared by the multitenancy
//! crates. Every entry can be tagged with the tenant that was active when it
//! was written, so log lines from concurrent requests can be told apart.
//!
//! # Usage
//!
//! ```rust
//! use multitenancy_log::{debug, info, warn};
//!
//! info!("Registered tenant provider {}", "database");
//! debug!(target: "multitenancy::manager", "Resolving tenant key {}", "acme");
//!
//! let tenant_id = String::from("42");
//! warn!(tenant: tenant_id, "Connection parser replaced");
//! ```
//!
//! # Environment Variables
//!
//! - `MULTITENANCY_DEBUG=1` - Enable debug logging
//! - `MULTITENANCY_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `MULTITENANCY_LOG_FORMAT=pretty|compact|json` - Set output format
//! - `MULTITENANCY_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `MULTITENANCY_LOG_MODULE=1|0` - Include the target (module path)

use once_cell::sync::Lazy;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human readable, one field per column
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Logging configuration.
#[derive(Debug)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the target
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Create config from `MULTITENANCY_*` environment variables.
    ///
    /// Also updates the global level and debug flag.
    pub fn from_env() -> Self {
        let debug = env_flag("MULTITENANCY_DEBUG").unwrap_or(false);

        let level = env::var("MULTITENANCY_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("MULTITENANCY_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let timestamps = env_flag("MULTITENANCY_LOG_TIMESTAMPS").unwrap_or(true);
        let module_path = env_flag("MULTITENANCY_LOG_MODULE").unwrap_or(true);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            timestamps,
            module_path,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Initialize the logging system eagerly.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Check if debug logging is enabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Check if a log level is enabled.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Check whether an entry at `level` would be written.
///
/// The debug flag forces debug entries through regardless of the level.
#[inline]
pub fn should_log(level: Level) -> bool {
    is_level_enabled(level) || (level == Level::Debug && is_debug_enabled())
}

/// Get current log level.
pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level at runtime.
pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Enable or disable debug mode at runtime.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Get the global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Log Output
// ============================================================================

/// A single log line, before formatting.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub level: Level,
    pub target: &'a str,
    pub tenant: Option<&'a str>,
    pub message: &'a str,
}

/// Log a message without tenant context.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    log_entry(Entry {
        level,
        target,
        tenant: None,
        message,
    });
}

/// Log a message tagged with a tenant id.
#[doc(hidden)]
pub fn log_with_tenant(level: Level, target: &str, tenant: &str, message: &str) {
    log_entry(Entry {
        level,
        target,
        tenant: Some(tenant),
        message,
    });
}

fn log_entry(entry: Entry<'_>) {
    if !should_log(entry.level) {
        return;
    }

    let config = config();
    let line = match config.format {
        Format::Pretty => format_pretty(&entry, config),
        Format::Compact => format_compact(&entry, config),
        Format::Json => format_json(&entry),
    };

    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

fn format_pretty(entry: &Entry<'_>, config: &LogConfig) -> String {
    let mut line = String::new();

    if config.timestamps {
        let now = chrono::Local::now();
        line.push_str(&format!("{} ", now.format("%Y-%m-%d %H:%M:%S%.3f")));
    }

    line.push_str(&format!("{:5} ", entry.level.as_str()));

    if config.module_path && !entry.target.is_empty() {
        line.push_str(&format!("[{}] ", entry.target));
    }

    if let Some(tenant) = entry.tenant {
        line.push_str(&format!("(tenant {}) ", tenant));
    }

    line.push_str(entry.message);
    line
}

fn format_compact(entry: &Entry<'_>, config: &LogConfig) -> String {
    let mut line = String::new();

    if config.timestamps {
        let now = chrono::Local::now();
        line.push_str(&format!("{} ", now.format("%H:%M:%S")));
    }

    line.push(entry.level.as_str().chars().next().unwrap_or('?'));
    line.push(' ');

    if config.module_path && !entry.target.is_empty() {
        line.push_str(entry.target);
        line.push_str(": ");
    }

    if let Some(tenant) = entry.tenant {
        line.push_str(tenant);
        line.push_str("| ");
    }

    line.push_str(entry.message);
    line
}

#[cfg(feature = "json")]
fn format_json(entry: &Entry<'_>) -> String {
    use serde::Serialize;

    #[derive(Serialize)]
    struct JsonEntry<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        tenant: Option<&'a str>,
        message: &'a str,
    }

    let json = JsonEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: entry.level.as_str(),
        target: entry.target,
        tenant: entry.tenant,
        message: entry.message,
    };

    serde_json::to_string(&json).unwrap_or_else(|_| entry.message.to_string())
}

#[cfg(not(feature = "json"))]
fn format_json(entry: &Entry<'_>) -> String {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let tenant = entry
        .tenant
        .map(|t| format!(r#","tenant":"{}""#, escape_json(t)))
        .unwrap_or_default();
    format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}"{},"message":"{}"}}"#,
        timestamp,
        entry.level.as_str(),
        escape_json(entry.target),
        tenant,
        escape_json(entry.message)
    )
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}

// ============================================================================
// Macros
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, tenant: $tenant:expr, $($arg:tt)+) => {
        if $crate::should_log($level) {
            $crate::log_with_tenant(
                $level,
                module_path!(),
                ::core::convert::AsRef::<str>::as_ref(&$tenant),
                &format!($($arg)+),
            );
        }
    };
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::should_log($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
    ($level:expr, $($arg:tt)+) => {
        if $crate::should_log($level) {
            $crate::log($level, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Trace, $($arg)+)
    };
}

/// Log a debug message.
///
/// Enabled by `MULTITENANCY_DEBUG=1` or `MULTITENANCY_LOG_LEVEL=debug`.
///
/// # Example
///
/// ```rust
/// use multitenancy_log::debug;
///
/// debug!("Resolving tenant");
/// debug!(target: "multitenancy::provider", "Trying column {}", "slug");
/// debug!(tenant: "42", "Rewrote connection {}", "mysql");
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Debug, $($arg)+)
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Info, $($arg)+)
    };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Warn, $($arg)+)
    };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Error, $($arg)+)
    };
}

// ============================================================================
// Tests
// ============================================================================
