//! Writer chain: the sinks a rendered record is dispatched to
//!
//! Writers are kept in registration order. A write walks the whole chain:
//! disabled writers are skipped without stopping the walk, and a writer that
//! fails is reported and the walk continues with the next one.

mod console;
mod rotating;

pub use console::{CaptureOutput, ConsoleOutput, ConsoleWriter, StdoutOutput, CONSOLE_WRITER_NAME};
pub use rotating::{FileSinkConfig, RotatingFileWriter, FILE_BUFFER_SIZE, FILE_WRITER_NAME};

use crate::error::{QlogError, Result};
use crate::format::LogBuffer;

/// A sink for rendered records
///
/// All methods are called with the logger's lock held.
pub trait Writer: Send {
    /// Name used to address the writer in the chain
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Prepare the sink. Called once when the writer is registered.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the sink. Pending output is flushed first.
    fn deinit(&mut self) -> Result<()> {
        self.flush()
    }

    /// Consume the current record
    fn write(&mut self, record: &LogBuffer) -> Result<()>;

    /// Push any buffered output to the sink
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Ordered list of writers owned by the logger
#[derive(Default)]
pub struct WriterChain {
    writers: Vec<Box<dyn Writer>>,
}

impl WriterChain {
    pub fn new() -> Self {
        WriterChain {
            writers: Vec::new(),
        }
    }

    /// Chain with `head` as its first writer
    pub fn with_head(head: Box<dyn Writer>) -> Result<Self> {
        let mut chain = Self::new();
        chain.push(head)?;
        Ok(chain)
    }

    /// Initialize `writer` and append it at the tail
    pub fn push(&mut self, mut writer: Box<dyn Writer>) -> Result<()> {
        writer.init()?;
        tracing::debug!(writer = writer.name(), position = self.writers.len(), "writer registered");
        self.writers.push(writer);
        Ok(())
    }

    /// Dispatch a record down the chain
    pub fn write(&mut self, record: &LogBuffer) {
        for writer in self.writers.iter_mut() {
            if !writer.is_enabled() {
                continue;
            }
            if let Err(e) = writer.write(record) {
                tracing::warn!(writer = writer.name(), "write failed: {}", e);
            }
        }
    }

    /// Flush every writer, enabled or not
    ///
    /// Returns the first failure after attempting all writers.
    pub fn flush_all(&mut self) -> Result<()> {
        self.for_each_reporting("flush", |w| w.flush())
    }

    /// De-initialize every writer
    pub fn deinit_all(&mut self) -> Result<()> {
        self.for_each_reporting("deinit", |w| w.deinit())
    }

    fn for_each_reporting<F>(&mut self, what: &str, mut op: F) -> Result<()>
    where
        F: FnMut(&mut dyn Writer) -> Result<()>,
    {
        let mut first_error = None;
        for writer in self.writers.iter_mut() {
            if let Err(e) = op(writer.as_mut()) {
                tracing::warn!(writer = writer.name(), "{} failed: {}", what, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// First writer registered under `name`
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Box<dyn Writer>> {
        self.writers.iter_mut().find(|w| w.name() == name)
    }

    /// Enable or disable the first writer registered under `name`
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let writer = self
            .find_mut(name)
            .ok_or_else(|| QlogError::WriterNotFound(name.to_string()))?;
        writer.set_enabled(enabled);
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.writers
            .iter()
            .find(|w| w.name() == name)
            .map(|w| w.is_enabled())
    }

    /// Writer names in chain order
    pub fn names(&self) -> Vec<&str> {
        self.writers.iter().map(|w| w.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl std::fmt::Debug for WriterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterChain")
            .field("writers", &self.names())
            .finish()
    }
}
