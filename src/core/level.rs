//! Record severity levels
//!
//! Lower numeric value = more severe. A record passes a threshold when its
//! numeric level is less than or equal to the threshold's.

use crate::error::{QlogError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of defined levels
pub const LEVEL_COUNT: usize = 5;

/// Severity of a log record
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Fatal = 0,
    Error = 1,
    Warning = 2,
    Info = 3,
    Debug = 4,
}

const PREFIXES: [&str; LEVEL_COUNT] = ["F/", "E/", "W/", "I/", "D/"];

// SGR bodies, each exactly COLOR_CODE_LEN bytes
const COLORS: [&str; LEVEL_COUNT] = ["4;91m", "4;95m", "2;93m", "1;96m", "1;92m"];

/// Length of every per-level color code
pub const COLOR_CODE_LEN: usize = 5;

impl Level {
    pub const ALL: [Level; LEVEL_COUNT] = [
        Level::Fatal,
        Level::Error,
        Level::Warning,
        Level::Info,
        Level::Debug,
    ];

    /// Convert a raw index into a level
    ///
    /// # Errors
    ///
    /// Returns `InvalidLevel` if `index >= LEVEL_COUNT`.
    pub fn from_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| QlogError::InvalidLevel(index.to_string()))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Level prefix written before the tag, e.g. `"E/"`
    pub fn prefix(self) -> &'static str {
        PREFIXES[self.index()]
    }

    /// ANSI color body (written after `COLOR_START`)
    pub fn color(self) -> &'static str {
        COLORS[self.index()]
    }

    /// Whether a record at this level passes `threshold`
    #[inline]
    pub fn passes(self, threshold: Level) -> bool {
        (self as u8) <= (threshold as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Fatal => "fatal",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = QlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(Level::Fatal),
            "error" => Ok(Level::Error),
            "warning" | "warn" => Ok(Level::Warning),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            other => Err(QlogError::InvalidLevel(other.to_string())),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Fatal < Level::Error);
        assert!(Level::Info < Level::Debug);
        assert_eq!(Level::Warning as u8, 2);
    }

    #[test]
    fn test_passes_threshold() {
        assert!(Level::Error.passes(Level::Warning));
        assert!(Level::Warning.passes(Level::Warning));
        assert!(!Level::Debug.passes(Level::Warning));
        assert!(Level::Fatal.passes(Level::Fatal));
    }

    #[test]
    fn test_from_index_rejects_out_of_range() {
        assert_eq!(Level::from_index(3).unwrap(), Level::Info);
        assert!(matches!(
            Level::from_index(LEVEL_COUNT as u8),
            Err(QlogError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_prefix_and_color() {
        assert_eq!(Level::Error.prefix(), "E/");
        assert_eq!(Level::Debug.prefix(), "D/");
        for level in Level::ALL {
            assert_eq!(level.color().len(), COLOR_CODE_LEN);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" debug ".parse::<Level>().unwrap(), Level::Debug);
        assert!("verbose".parse::<Level>().is_err());
    }
}
