//! Rotating file sink
//!
//! Records are stripped of color codes and appended to an internal buffer of
//! [`FILE_BUFFER_SIZE`] bytes. Each time the buffer fills it is flushed to the
//! active file. A flush that would push the active file to its size cap rotates
//! first:
//!
//! ```text
//! remove  path.(N-1)
//! rename  path.(N-2) -> path.(N-1) ... path.0 -> path.1
//! rename  path       -> path.0
//! ```
//!
//! and a fresh `path` is opened lazily by the flush itself. Index 0 is the most
//! recently rotated generation.

use super::Writer;
use crate::error::{QlogError, Result};
use crate::format::LogBuffer;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const FILE_WRITER_NAME: &str = "file";

/// Size of the internal file buffer
pub const FILE_BUFFER_SIZE: usize = 512;

const LOG_SUFFIX: &str = ".log";

/// File sink settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// File name; `.log` is appended unless already present
    pub name: String,
    /// Directory holding the log files, created if missing
    pub directory: PathBuf,
    /// Rotated generations kept next to the active file
    pub file_count: usize,
    /// Size cap of a single file in bytes
    pub file_size: u64,
}

impl FileSinkConfig {
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        file_count: usize,
        file_size: u64,
    ) -> Self {
        FileSinkConfig {
            name: name.into(),
            directory: directory.into(),
            file_count,
            file_size,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(QlogError::InvalidConfig("file sink name is empty".to_string()));
        }
        if self.file_count == 0 {
            return Err(QlogError::InvalidConfig(
                "file sink needs at least one file".to_string(),
            ));
        }
        if self.file_size <= FILE_BUFFER_SIZE as u64 {
            return Err(QlogError::InvalidConfig(format!(
                "file size {} must exceed the file buffer ({} bytes)",
                self.file_size, FILE_BUFFER_SIZE
            )));
        }
        Ok(())
    }

    /// Path of the active log file
    pub fn file_path(&self) -> PathBuf {
        let mut file_name = self.name.clone();
        if !file_name.ends_with(LOG_SUFFIX) {
            file_name.push_str(LOG_SUFFIX);
        }
        self.directory.join(file_name)
    }
}

/// Generation `index` of `path`, e.g. `app.log.3`
pub fn generation_path(path: &Path, index: usize) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(format!(".{}", index));
    PathBuf::from(raw)
}

/// File writer with size-capped generational rotation
pub struct RotatingFileWriter {
    enabled: bool,
    config: FileSinkConfig,
    path: PathBuf,
    /// Active file, opened lazily on flush
    file: Option<File>,
    /// Bytes written to the active file
    write_position: u64,
    buffer: Box<[u8; FILE_BUFFER_SIZE]>,
    /// Occupied prefix of `buffer`
    cursor: usize,
}

impl RotatingFileWriter {
    /// Build a writer; the filesystem is untouched until [`Writer::init`]
    ///
    /// The writer starts disabled.
    pub fn new(config: FileSinkConfig) -> Result<Self> {
        config.validate()?;
        let path = config.file_path();
        Ok(RotatingFileWriter {
            enabled: false,
            config,
            path,
            file: None,
            write_position: 0,
            buffer: Box::new([0u8; FILE_BUFFER_SIZE]),
            cursor: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &FileSinkConfig {
        &self.config
    }

    /// Bytes waiting in the internal buffer
    pub fn pending(&self) -> usize {
        self.cursor
    }

    pub fn write_position(&self) -> u64 {
        self.write_position
    }

    fn open(&mut self) -> Result<()> {
        // Truncating create: a fresh generation starts empty
        let file = File::create(&self.path).map_err(|e| {
            tracing::error!(path = %self.path.display(), "cannot open log file: {}", e);
            e
        })?;
        self.file = Some(file);
        self.write_position = 0;
        Ok(())
    }

    /// Shift every generation up by one and retire the active file
    pub fn rotate(&mut self) {
        tracing::debug!(path = %self.path.display(), "rotating log files");

        // Close before renaming
        self.file = None;
        self.write_position = 0;

        let count = self.config.file_count;
        let oldest = generation_path(&self.path, count - 1);
        if oldest.exists() {
            if let Err(e) = fs::remove_file(&oldest) {
                tracing::warn!(path = %oldest.display(), "cannot remove oldest log: {}", e);
            }
        }

        for index in (0..count - 1).rev() {
            let from = generation_path(&self.path, index);
            if !from.exists() {
                continue;
            }
            let to = generation_path(&self.path, index + 1);
            if let Err(e) = fs::rename(&from, &to) {
                tracing::warn!(from = %from.display(), to = %to.display(), "rename failed: {}", e);
            }
        }

        if self.path.exists() {
            let newest = generation_path(&self.path, 0);
            if let Err(e) = fs::rename(&self.path, &newest) {
                tracing::warn!(from = %self.path.display(), to = %newest.display(), "rename failed: {}", e);
            }
        }
    }
}

impl Writer for RotatingFileWriter {
    fn name(&self) -> &str {
        FILE_WRITER_NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Create the directory and clear out a leftover active file
    fn init(&mut self) -> Result<()> {
        let directory = &self.config.directory;
        if !directory.exists() {
            if let Err(e) = fs::create_dir_all(directory) {
                tracing::error!(directory = %directory.display(), "failed to create log directory: {}", e);
            }
        }

        if self.path.exists() {
            tracing::warn!(path = %self.path.display(), "log file exists, removing");
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), "cannot remove log file: {}", e);
            }
        }
        Ok(())
    }

    fn write(&mut self, record: &LogBuffer) -> Result<()> {
        let mut data = record.plain_bytes();

        while !data.is_empty() {
            let free = FILE_BUFFER_SIZE - self.cursor;
            let n = free.min(data.len());
            self.buffer[self.cursor..self.cursor + n].copy_from_slice(&data[..n]);
            self.cursor += n;
            data = &data[n..];

            debug_assert!(self.cursor <= FILE_BUFFER_SIZE);
            if self.cursor == FILE_BUFFER_SIZE {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Write the buffered bytes to the active file, rotating first if needed
    ///
    /// The buffer is emptied even when the write fails.
    fn flush(&mut self) -> Result<()> {
        let pending = self.cursor;
        if pending == 0 {
            return Ok(());
        }
        self.cursor = 0;

        if self.write_position + pending as u64 >= self.config.file_size {
            self.rotate();
        }
        if self.file.is_none() {
            self.open()?;
        }
        if let Some(file) = self.file.as_mut() {
            let (written, result) = write_counted(file, &self.buffer[..pending]);
            // Partial writes still occupy the file
            self.write_position += written as u64;
            result?;
            file.flush()?;
        }
        Ok(())
    }
}

/// `write_all` that also reports how many bytes reached `out`
fn write_counted(out: &mut impl Write, data: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while written < data.len() {
        match out.write(&data[written..]) {
            Ok(0) => return (written, Err(io::ErrorKind::WriteZero.into())),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}

impl Drop for RotatingFileWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), "dropping unflushed log data: {}", e);
        }
    }
}
