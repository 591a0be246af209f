//! Logger orchestration
//!
//! The logger owns the shared [`LogBuffer`], the tag filter, the formatter and
//! the writer chain. All four sit behind one lock, so at most one record is
//! rendered and dispatched at a time. The lock primitive is pluggable through
//! [`lock_api::RawMutex`]; `parking_lot::RawMutex` is the default.
//!
//! The global level is kept outside the lock. Records noisier than it are
//! dropped before the lock is touched.

use crate::error::{QlogError, Result};
use crate::filter::TagFilter;
use crate::format::{Formatter, LogBuffer};
use crate::level::Level;
use crate::writer::{
    FileSinkConfig, RotatingFileWriter, Writer, WriterChain, CONSOLE_WRITER_NAME,
    FILE_WRITER_NAME,
};
use parking_lot::lock_api::{self, RawMutex};
use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};

thread_local! {
    /// Set while this thread is inside `Logger::log`
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as dispatching until dropped
struct DispatchScope;

impl DispatchScope {
    /// `None` if the thread is already dispatching
    fn enter() -> Option<Self> {
        DISPATCHING.with(|flag| (!flag.replace(true)).then_some(DispatchScope))
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(false));
    }
}

/// Lifecycle of a logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    Ready,
    Deinitialized,
}

/// Everything the lock guards
struct Dispatch {
    buffer: LogBuffer,
    filter: TagFilter,
    formatter: Formatter,
    writers: WriterChain,
}

/// Collaborators handed back by [`Logger::deinit`]
#[derive(Debug)]
pub struct Collaborators {
    pub filter: TagFilter,
    pub formatter: Formatter,
    pub writers: WriterChain,
}

/// Thread-safe logging pipeline
pub struct Logger<R: RawMutex = parking_lot::RawMutex> {
    level: AtomicU8,
    dispatch: lock_api::Mutex<R, Option<Dispatch>>,
}

impl Logger {
    /// Wire the collaborators behind the default lock
    pub fn init(level: Level, formatter: Formatter, writers: WriterChain, filter: TagFilter) -> Self {
        Self::init_with_lock(level, formatter, writers, filter)
    }
}

impl<R: RawMutex> Logger<R> {
    /// Wire the collaborators behind a caller-chosen lock primitive
    pub fn init_with_lock(
        level: Level,
        formatter: Formatter,
        writers: WriterChain,
        mut filter: TagFilter,
    ) -> Self {
        filter.set_global_level(level);
        tracing::debug!(level = %level, writers = ?writers.names(), "logger initialized");

        Logger {
            level: AtomicU8::new(level as u8),
            dispatch: lock_api::Mutex::new(Some(Dispatch {
                buffer: LogBuffer::new(),
                filter,
                formatter,
                writers,
            })),
        }
    }

    /// Emit one record
    ///
    /// Never fails. Sink errors are reported through `tracing` and the record
    /// may be lost. A no-op once the logger is deinitialized.
    ///
    /// `args` are evaluated with the lock held. A record emitted while they
    /// are being formatted, on the same thread, is dropped.
    pub fn log(&self, tag: Option<&str>, level: Level, args: fmt::Arguments<'_>) {
        if !level.passes(self.level()) {
            return;
        }

        let Some(_scope) = DispatchScope::enter() else {
            tracing::warn!(tag = tag.unwrap_or(""), level = %level, "nested log call dropped");
            return;
        };
        let mut guard = self.dispatch.lock();
        let Some(dispatch) = guard.as_mut() else {
            return;
        };
        if dispatch.filter.invoke(tag, level) {
            return;
        }
        dispatch
            .formatter
            .invoke(&mut dispatch.buffer, tag, level, args);
        dispatch.writers.write(&dispatch.buffer);
    }

    /// Current global level
    pub fn level(&self) -> Level {
        Level::ALL[self.level.load(Ordering::Acquire) as usize]
    }

    pub fn set_level(&self, level: Level) -> Result<()> {
        self.with_dispatch(|d| {
            d.filter.set_global_level(level);
            self.level.store(level as u8, Ordering::Release);
            Ok(())
        })
    }

    pub fn state(&self) -> LoggerState {
        if self.dispatch.lock().is_some() {
            LoggerState::Ready
        } else {
            LoggerState::Deinitialized
        }
    }

    /// Add a `(tag, max level)` rule to the filter
    pub fn add_filter_rule(&self, tag: &str, max_level: Level) -> Result<()> {
        self.with_dispatch(|d| d.filter.append(tag, max_level))
    }

    /// Append a writer at the tail of the chain
    pub fn register_writer(&self, writer: Box<dyn Writer>) -> Result<()> {
        self.with_dispatch(|d| d.writers.push(writer))
    }

    pub fn enable_writer(&self, name: &str, enabled: bool) -> Result<()> {
        self.with_dispatch(|d| d.writers.set_enabled(name, enabled))
    }

    /// Whether the writer named `name` is enabled, `None` if unknown
    pub fn is_writer_enabled(&self, name: &str) -> Option<bool> {
        self.dispatch
            .lock()
            .as_ref()
            .and_then(|d| d.writers.is_enabled(name))
    }

    pub fn enable_console_sink(&self, enabled: bool) -> Result<()> {
        self.enable_writer(CONSOLE_WRITER_NAME, enabled)
    }

    pub fn enable_file_sink(&self, enabled: bool) -> Result<()> {
        self.enable_writer(FILE_WRITER_NAME, enabled)
    }

    /// Register the rotating file sink
    ///
    /// The sink starts disabled; turn it on with [`Logger::enable_file_sink`].
    pub fn register_file_sink(
        &self,
        name: &str,
        directory: impl Into<PathBuf>,
        file_count: usize,
        file_size: u64,
    ) -> Result<()> {
        self.register_file_sink_config(FileSinkConfig::new(name, directory, file_count, file_size))
    }

    pub fn register_file_sink_config(&self, config: FileSinkConfig) -> Result<()> {
        let writer = RotatingFileWriter::new(config)?;
        self.with_dispatch(|d| {
            if d.writers.is_enabled(FILE_WRITER_NAME).is_some() {
                return Err(QlogError::InvalidConfig(
                    "a file sink is already registered".to_string(),
                ));
            }
            d.writers.push(Box::new(writer))
        })
    }

    /// Writer names in chain order
    pub fn writer_names(&self) -> Vec<String> {
        self.dispatch
            .lock()
            .as_ref()
            .map(|d| d.writers.names().into_iter().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Flush every writer
    pub fn flush(&self) -> Result<()> {
        self.with_dispatch(|d| d.writers.flush_all())
    }

    /// Tear the logger down
    ///
    /// Writers are flushed and deinitialized, the shared buffer is zeroed and
    /// the level is reset. Returns the collaborators on the first call and
    /// `None` afterwards.
    pub fn deinit(&self) -> Option<Collaborators> {
        let mut dispatch = self.dispatch.lock().take()?;
        self.level.store(Level::Fatal as u8, Ordering::Release);

        if let Err(e) = dispatch.writers.deinit_all() {
            tracing::warn!("writer teardown incomplete: {}", e);
        }
        dispatch.buffer.clear();
        tracing::debug!("logger deinitialized");

        Some(Collaborators {
            filter: dispatch.filter,
            formatter: dispatch.formatter,
            writers: dispatch.writers,
        })
    }

    /// Writer names, `None` while the lock is held elsewhere
    fn try_writer_names(&self) -> Option<Vec<String>> {
        let guard = self.dispatch.try_lock()?;
        let names = guard
            .as_ref()
            .map(|d| d.writers.names().into_iter().map(str::to_owned).collect())
            .unwrap_or_default();
        Some(names)
    }

    fn with_dispatch<T>(&self, op: impl FnOnce(&mut Dispatch) -> Result<T>) -> Result<T> {
        let mut guard = self.dispatch.lock();
        let dispatch = guard.as_mut().ok_or(QlogError::NotInitialized)?;
        op(dispatch)
    }
}

impl<R: RawMutex> fmt::Debug for Logger<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never block: this may run while formatting a record of this logger
        let mut s = f.debug_struct("Logger");
        s.field("level", &self.level());
        match self.try_writer_names() {
            Some(names) => s.field("writers", &names),
            None => s.field("writers", &format_args!("<locked>")),
        };
        s.finish()
    }
}

impl<R: RawMutex> Drop for Logger<R> {
    fn drop(&mut self) {
        self.deinit();
    }
}
