//! # qlog - Embeddable Logging Runtime
//!
//! `qlog-rs` renders tagged, leveled records into a fixed 512-byte buffer and
//! dispatches them to a chain of sinks under a single lock:
//!
//! - **Global level gate** checked without taking the lock
//! - **Per-tag rules** stored in a fixed-block pool, no heap use after setup
//! - **Console sink** with optional ANSI color and `MM-DD HH:MM:SS.mmm` timestamps
//! - **Rotating file sink** with buffered writes and generational rotation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qlog_rs::{initialize, Level, Result};
//!
//! # fn main() -> Result<()> {
//! let logger = initialize(Level::Info, true, true, 32)?;
//!
//! // Only errors and worse from "net"
//! logger.add_filter_rule("net", Level::Error)?;
//!
//! // app.log, app.log.0 ... app.log.3, 1 MiB each
//! logger.register_file_sink("app", "/var/log/app", 4, 1 << 20)?;
//! logger.enable_file_sink(true)?;
//!
//! logger.log(Some("net"), Level::Error, format_args!("link down: {}\n", "eth0"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Builder
//!
//! ```rust,no_run
//! use qlog_rs::{Level, LoggerBuilder, QlogConfig, Result};
//!
//! # fn main() -> Result<()> {
//! let config = QlogConfig::from_path("qlog.toml")?;
//! let logger = LoggerBuilder::from_config(&config)
//!     .filter_rule("disk", Level::Warning)
//!     .build()?;
//!
//! logger.log(Some("disk"), Level::Warning, format_args!("{}% full\n", 91));
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules internally so crate:: paths in core still work
#[allow(unused_imports)]
pub(crate) use crate::core::{config, error, filter, format, level, logger, pool, writer};

// Re-export core types that users need
pub use crate::core::{
    config::{FileSection, FilterRule, QlogConfig, DEFAULT_TAG_CAPACITY},
    error::{QlogError, Result},
    filter::{TagFilter, TagRule, TAG_CAPACITY},
    format::{Formatter, LogBuffer, COLOR_END, COLOR_START, LOG_BUFFER_SIZE},
    level::{Level, LEVEL_COUNT},
    logger::{Collaborators, Logger, LoggerState},
    pool::{BlockHandle, BlockPool},
    writer::{
        CaptureOutput, ConsoleOutput, ConsoleWriter, FileSinkConfig, RotatingFileWriter,
        StdoutOutput, Writer, WriterChain, CONSOLE_WRITER_NAME, FILE_BUFFER_SIZE,
        FILE_WRITER_NAME,
    },
};

use parking_lot::lock_api::RawMutex;
use tracing::{debug, info};

/// Create a logger with a console sink on stdout
///
/// # Arguments
///
/// * `level` - Global level threshold
/// * `enable_color` - Frame records in ANSI color codes
/// * `enable_timestamp` - Prefix records with the local time
/// * `tag_capacity` - Maximum number of filter rules
///
/// # Errors
///
/// Returns `InvalidPoolGeometry` if `tag_capacity` is zero.
pub fn initialize(
    level: Level,
    enable_color: bool,
    enable_timestamp: bool,
    tag_capacity: usize,
) -> Result<Logger> {
    LoggerBuilder::new()
        .level(level)
        .color(enable_color)
        .timestamp(enable_timestamp)
        .tag_capacity(tag_capacity)
        .build()
}

/// Builder for customizing Logger creation
///
/// The console writer is always first in the chain, followed by the file
/// sink if one is configured, followed by custom writers in the order given.
///
/// # Examples
///
/// ```rust,no_run
/// use qlog_rs::{FileSinkConfig, Level, LoggerBuilder};
///
/// # fn main() -> qlog_rs::Result<()> {
/// let logger = LoggerBuilder::new()
///     .level(Level::Debug)
///     .color(true)
///     .file_sink(FileSinkConfig::new("app", "/tmp/app-logs", 3, 64 * 1024), true)
///     .filter_rule("net", Level::Warning)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct LoggerBuilder {
    level: Level,
    color: bool,
    timestamp: bool,
    tag_capacity: usize,
    console: bool,
    console_output: Option<Box<dyn ConsoleOutput>>,
    file: Option<(FileSinkConfig, bool)>,
    filters: Vec<(String, Level)>,
    writers: Vec<Box<dyn Writer>>,
}

impl LoggerBuilder {
    /// Create a new LoggerBuilder with the defaults of [`QlogConfig`]
    pub fn new() -> Self {
        let defaults = QlogConfig::default();
        LoggerBuilder {
            level: defaults.level,
            color: defaults.color,
            timestamp: defaults.timestamp,
            tag_capacity: defaults.tag_capacity,
            console: defaults.console,
            console_output: None,
            file: None,
            filters: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Start from a parsed configuration
    pub fn from_config(config: &QlogConfig) -> Self {
        let mut builder = Self::new()
            .level(config.level)
            .color(config.color)
            .timestamp(config.timestamp)
            .tag_capacity(config.tag_capacity)
            .console(config.console);

        if let Some(file) = &config.file {
            builder = builder.file_sink(file.sink(), file.enabled);
        }
        for rule in &config.filters {
            builder = builder.filter_rule(rule.tag.clone(), rule.level);
        }
        builder
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn color(mut self, enabled: bool) -> Self {
        self.color = enabled;
        self
    }

    pub fn timestamp(mut self, enabled: bool) -> Self {
        self.timestamp = enabled;
        self
    }

    /// Maximum number of filter rules
    pub fn tag_capacity(mut self, capacity: usize) -> Self {
        self.tag_capacity = capacity;
        self
    }

    /// Enable or disable the console sink
    pub fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Send console output somewhere other than stdout
    pub fn console_output(mut self, output: Box<dyn ConsoleOutput>) -> Self {
        self.console_output = Some(output);
        self
    }

    /// Register the rotating file sink
    pub fn file_sink(mut self, config: FileSinkConfig, enabled: bool) -> Self {
        self.file = Some((config, enabled));
        self
    }

    pub fn filter_rule<S: Into<String>>(mut self, tag: S, max_level: Level) -> Self {
        self.filters.push((tag.into(), max_level));
        self
    }

    /// Append a custom writer after the built-in sinks
    pub fn writer(mut self, writer: Box<dyn Writer>) -> Self {
        self.writers.push(writer);
        self
    }

    /// Build the Logger instance
    pub fn build(self) -> Result<Logger> {
        self.build_with_lock()
    }

    /// Build a Logger guarded by a custom lock primitive
    pub fn build_with_lock<R: RawMutex>(self) -> Result<Logger<R>> {
        let mut filter = TagFilter::with_capacity(self.tag_capacity, self.level)?;
        for (tag, level) in &self.filters {
            filter.append(tag, *level)?;
        }

        let mut console = match self.console_output {
            Some(output) => ConsoleWriter::with_output(output),
            None => ConsoleWriter::new(),
        };
        console.set_enabled(self.console);
        let mut writers = WriterChain::with_head(Box::new(console))?;

        if let Some((config, enabled)) = self.file {
            let mut file = RotatingFileWriter::new(config)?;
            file.set_enabled(enabled);
            debug!(path = %file.path().display(), enabled, "file sink configured");
            writers.push(Box::new(file))?;
        }
        for writer in self.writers {
            writers.push(writer)?;
        }

        info!(
            "Building logger at level '{}' with {} filter rule(s)",
            self.level,
            filter.len()
        );

        Ok(Logger::init_with_lock(
            self.level,
            Formatter::new(self.color, self.timestamp),
            writers,
            filter,
        ))
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
