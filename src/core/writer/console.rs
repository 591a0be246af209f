//! Console sink

use super::Writer;
use crate::error::Result;
use crate::format::LogBuffer;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

pub const CONSOLE_WRITER_NAME: &str = "console";

/// Output port used by the console writer
///
/// Implementations must write each call's bytes as one unit so that records
/// from different threads never interleave.
pub trait ConsoleOutput: Send {
    fn output_string(&mut self, text: &[u8]) -> io::Result<()>;
}

/// Default port: process stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutOutput;

impl ConsoleOutput for StdoutOutput {
    fn output_string(&mut self, text: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text)?;
        out.flush()
    }
}

/// In-memory port; clones share the same buffer
#[derive(Debug, Default, Clone)]
pub struct CaptureOutput {
    captured: Arc<Mutex<Vec<u8>>>,
}

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> Vec<u8> {
        self.captured.lock().clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.captured.lock()).into_owned()
    }

    /// Captured text split on newlines, trailing empty line dropped
    pub fn lines(&self) -> Vec<String> {
        self.to_string_lossy().lines().map(str::to_owned).collect()
    }

    pub fn clear(&self) {
        self.captured.lock().clear();
    }
}

impl ConsoleOutput for CaptureOutput {
    fn output_string(&mut self, text: &[u8]) -> io::Result<()> {
        self.captured.lock().extend_from_slice(text);
        Ok(())
    }
}

/// Writes each record verbatim, color codes included
pub struct ConsoleWriter {
    enabled: bool,
    output: Box<dyn ConsoleOutput>,
}

impl ConsoleWriter {
    /// Console writer on stdout
    pub fn new() -> Self {
        Self::with_output(Box::new(StdoutOutput))
    }

    pub fn with_output(output: Box<dyn ConsoleOutput>) -> Self {
        ConsoleWriter {
            enabled: true,
            output,
        }
    }
}

impl Default for ConsoleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for ConsoleWriter {
    fn name(&self) -> &str {
        CONSOLE_WRITER_NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn write(&mut self, record: &LogBuffer) -> Result<()> {
        self.output.output_string(record.as_bytes())?;
        Ok(())
    }
}
