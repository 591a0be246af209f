//! Record formatting into the shared log buffer
//!
//! Layout, left to right:
//!
//! ```text
//! [COLOR_START + level color]? [MM-DD HH:MM:SS.mmm ]? [level prefix][tag]": "[message][COLOR_END]? NUL
//! ```
//!
//! The buffer is fixed at [`LOG_BUFFER_SIZE`] bytes. When a record does not
//! fit, the message body is cut so that the color terminator and the NUL still
//! fit.

use crate::level::{Level, COLOR_CODE_LEN};
use chrono::{DateTime, Local};
use std::fmt::{self, Write as _};
use std::time::{SystemTime, UNIX_EPOCH};

/// Capacity of the shared log buffer, NUL included
pub const LOG_BUFFER_SIZE: usize = 512;

/// ANSI control sequence introducer
pub const COLOR_START: &str = "\x1b[";

/// ANSI reset sequence
pub const COLOR_END: &str = "\x1b[0;m";

/// Bytes occupied by the color prefix of a colored record
pub const COLOR_PREFIX_LEN: usize = COLOR_START.len() + COLOR_CODE_LEN;

/// Fixed-capacity buffer holding exactly one rendered record
#[derive(Clone)]
pub struct LogBuffer {
    bytes: [u8; LOG_BUFFER_SIZE],
    /// Rendered length, NUL excluded
    len: usize,
    /// Whether the record is framed by color codes
    colored: bool,
}

impl LogBuffer {
    pub fn new() -> Self {
        LogBuffer {
            bytes: [0u8; LOG_BUFFER_SIZE],
            len: 0,
            colored: false,
        }
    }

    /// Rendered record as written to the console
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Rendered record including its NUL terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes[..=self.len]
    }

    /// Rendered record with the color prefix and suffix removed
    ///
    /// The stripped ranges come from the fixed lengths of the color codes.
    pub fn plain_bytes(&self) -> &[u8] {
        if !self.colored || self.len < COLOR_PREFIX_LEN + COLOR_END.len() {
            return self.as_bytes();
        }
        &self.bytes[COLOR_PREFIX_LEN..self.len - COLOR_END.len()]
    }

    /// Lossy UTF-8 view, mostly useful in tests
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }

    pub fn capacity(&self) -> usize {
        LOG_BUFFER_SIZE
    }

    /// Zero the buffer
    pub fn clear(&mut self) {
        self.bytes.fill(0);
        self.len = 0;
        self.colored = false;
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuffer")
            .field("len", &self.len)
            .field("colored", &self.colored)
            .field("text", &self.to_string_lossy())
            .finish()
    }
}

/// `fmt::Write` sink that silently stops at `limit`
struct BoundedCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
    limit: usize,
}

impl fmt::Write for BoundedCursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.limit - self.pos;
        let n = room.min(s.len());
        self.buf[self.pos..self.pos + n].copy_from_slice(&s.as_bytes()[..n]);
        self.pos += n;
        Ok(())
    }
}

/// Renders records into a [`LogBuffer`]
#[derive(Debug, Clone)]
pub struct Formatter {
    color: bool,
    timestamp: bool,
    clock: fn() -> SystemTime,
}

impl Formatter {
    pub fn new(color: bool, timestamp: bool) -> Self {
        Formatter {
            color,
            timestamp,
            clock: SystemTime::now,
        }
    }

    /// Replace the wall clock used for timestamps
    pub fn with_clock(mut self, clock: fn() -> SystemTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn timestamp(&self) -> bool {
        self.timestamp
    }

    /// Render one record and return its length (NUL excluded)
    pub fn invoke(
        &self,
        buffer: &mut LogBuffer,
        tag: Option<&str>,
        level: Level,
        args: fmt::Arguments<'_>,
    ) -> usize {
        let color_end_len = if self.color { COLOR_END.len() } else { 0 };
        let mut cursor = BoundedCursor {
            buf: &mut buffer.bytes,
            pos: 0,
            // Room for the color terminator and the NUL is never given away
            limit: LOG_BUFFER_SIZE - color_end_len - 1,
        };

        // BoundedCursor never fails
        if self.color {
            let _ = cursor.write_str(COLOR_START);
            let _ = cursor.write_str(level.color());
        }
        if self.timestamp {
            let now = self.now();
            let _ = write!(cursor, "{} ", now.format("%m-%d %H:%M:%S%.3f"));
        }
        let _ = cursor.write_str(level.prefix());
        let _ = cursor.write_str(tag.unwrap_or(""));
        let _ = cursor.write_str(": ");
        let _ = cursor.write_fmt(args);

        let mut len = cursor.pos;
        if self.color {
            buffer.bytes[len..len + color_end_len].copy_from_slice(COLOR_END.as_bytes());
            len += color_end_len;
        }
        buffer.bytes[len] = 0;

        buffer.len = len;
        buffer.colored = self.color;
        len
    }

    /// Local wall-clock time; a clock before the epoch reads as the epoch
    fn now(&self) -> DateTime<Local> {
        let since_epoch = (self.clock)()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        DateTime::<Local>::from(UNIX_EPOCH + since_epoch)
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(false, false)
    }
}
