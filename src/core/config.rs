//! TOML configuration
//!
//! ```toml
//! level = "info"
//! color = true
//! timestamp = true
//! tag_capacity = 32
//! console = true
//!
//! [file]
//! name = "app"
//! directory = "/var/log/app"
//! file_count = 4
//! file_size = 1048576
//! enabled = true
//!
//! [[filter]]
//! tag = "net"
//! level = "warning"
//! ```
//!
//! Every key is optional; missing keys take the defaults of
//! [`QlogConfig::default`].

use crate::error::{QlogError, Result};
use crate::filter::TAG_CAPACITY;
use crate::level::Level;
use crate::writer::FileSinkConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default number of filter rules a logger can hold
pub const DEFAULT_TAG_CAPACITY: usize = 32;

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QlogConfig {
    /// Global level threshold
    pub level: Level,

    /// Frame records in ANSI color codes
    pub color: bool,

    /// Prefix records with `MM-DD HH:MM:SS.mmm`
    pub timestamp: bool,

    /// Maximum number of filter rules
    pub tag_capacity: usize,

    /// Enable the console sink
    pub console: bool,

    /// Rotating file sink
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileSection>,

    /// Per-tag rules in evaluation order
    #[serde(rename = "filter", skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterRule>,
}

/// `[file]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSection {
    pub name: String,
    pub directory: PathBuf,
    pub file_count: usize,
    pub file_size: u64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl FileSection {
    pub fn sink(&self) -> FileSinkConfig {
        FileSinkConfig::new(
            self.name.clone(),
            self.directory.clone(),
            self.file_count,
            self.file_size,
        )
    }
}

/// `[[filter]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRule {
    pub tag: String,
    pub level: Level,
}

impl Default for QlogConfig {
    fn default() -> Self {
        QlogConfig {
            level: Level::Info,
            color: false,
            timestamp: true,
            tag_capacity: DEFAULT_TAG_CAPACITY,
            console: true,
            file: None,
            filters: Vec::new(),
        }
    }
}

impl QlogConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: QlogConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations the logger cannot be built from
    ///
    /// Checks:
    /// - `tag_capacity` is non-zero and holds every `[[filter]]` rule
    /// - filter tags are non-empty and at most `TAG_CAPACITY` bytes
    /// - the file sink geometry is usable
    pub fn validate(&self) -> Result<()> {
        if self.tag_capacity == 0 {
            return Err(QlogError::InvalidConfig(
                "tag_capacity must be at least 1".to_string(),
            ));
        }
        if self.filters.len() > self.tag_capacity {
            return Err(QlogError::InvalidConfig(format!(
                "{} filter rules exceed tag_capacity {}",
                self.filters.len(),
                self.tag_capacity
            )));
        }

        for rule in &self.filters {
            if rule.tag.is_empty() {
                return Err(QlogError::EmptyTag);
            }
            if rule.tag.len() > TAG_CAPACITY {
                return Err(QlogError::TagTooLong {
                    tag: rule.tag.clone(),
                    capacity: TAG_CAPACITY,
                });
            }
        }

        if let Some(file) = &self.file {
            file.sink().validate()?;
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| QlogError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = QlogConfig::from_toml_str("").unwrap();
        assert_eq!(config, QlogConfig::default());
        assert_eq!(config.tag_capacity, DEFAULT_TAG_CAPACITY);
        assert!(config.console);
    }

    #[test]
    fn test_full_document() {
        let text = r#"
            level = "Debug"
            color = true
            timestamp = false
            tag_capacity = 4
            console = false

            [file]
            name = "app"
            directory = "/tmp/qlog"
            file_count = 3
            file_size = 4096

            [[filter]]
            tag = "net"
            level = "warn"

            [[filter]]
            tag = "disk"
            level = "error"
        "#;
        let config = QlogConfig::from_toml_str(text).unwrap();

        assert_eq!(config.level, Level::Debug);
        assert!(config.color);
        assert!(!config.timestamp);
        assert!(!config.console);

        let file = config.file.as_ref().unwrap();
        assert!(file.enabled);
        assert_eq!(file.sink().file_path(), PathBuf::from("/tmp/qlog/app.log"));

        assert_eq!(
            config.filters,
            vec![
                FilterRule { tag: "net".into(), level: Level::Warning },
                FilterRule { tag: "disk".into(), level: Level::Error },
            ]
        );
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(matches!(
            QlogConfig::from_toml_str(r#"level = "loud""#),
            Err(QlogError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(QlogConfig::from_toml_str("colour = true").is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = QlogConfig::default();
        config.tag_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = QlogConfig::default();
        config.tag_capacity = 1;
        config.filters = vec![
            FilterRule { tag: "a".into(), level: Level::Info },
            FilterRule { tag: "b".into(), level: Level::Info },
        ];
        assert!(config.validate().is_err());

        let mut config = QlogConfig::default();
        config.filters = vec![FilterRule { tag: "x".repeat(TAG_CAPACITY + 1), level: Level::Info }];
        assert!(matches!(config.validate(), Err(QlogError::TagTooLong { .. })));

        let mut config = QlogConfig::default();
        config.file = Some(FileSection {
            name: "app".into(),
            directory: "/tmp".into(),
            file_count: 2,
            file_size: 100,
            enabled: true,
        });
        assert!(matches!(config.validate(), Err(QlogError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("qlog.toml");
        fs::write(&path, "level = \"error\"\n[[filter]]\ntag = \"net\"\nlevel = \"debug\"\n").unwrap();

        let config = QlogConfig::from_path(&path).unwrap();
        assert_eq!(config.level, Level::Error);
        assert_eq!(config.filters.len(), 1);

        assert!(matches!(
            QlogConfig::from_path(dir.path().join("missing.toml")),
            Err(QlogError::Io(_))
        ));
    }

    #[test]
    fn test_toml_output_reparses() {
        let mut config = QlogConfig::default();
        config.level = Level::Warning;
        config.filters.push(FilterRule { tag: "net".into(), level: Level::Debug });

        let text = config.to_toml_string().unwrap();
        assert_eq!(QlogConfig::from_toml_str(&text).unwrap(), config);
    }
}
