// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration.
//!
//! Loaded from a RON file; every field falls back to its default so a
//! partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "eventgraph.ron";

/// Which links of an execution output fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecFanout {
    /// Every link, in declaration order
    #[default]
    AllLinks,
    /// Only the first declared link
    FirstLink,
}

/// Error loading or saving a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Configuration could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fan-out policy of execution outputs
    pub exec_fanout: ExecFanout,
    /// Clear global variables before every entry-trigger run
    pub flush_globals_before_run: bool,
    /// Prune mismatched links and reject data cycles before running
    pub validate_before_run: bool,
    /// Maximum nesting of execution hops
    pub max_exec_depth: usize,
    /// Maximum nesting of value pulls
    pub max_pull_depth: usize,
    /// Shortest delay accepted by the delay nodes, in seconds
    pub min_delay_secs: f64,
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exec_fanout: ExecFanout::AllLinks,
            flush_globals_before_run: true,
            validate_before_run: true,
            max_exec_depth: 512,
            max_pull_depth: 256,
            min_delay_secs: 0.1,
            log_filter: "eventgraph=info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse from RON
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Load from a file, using defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    /// Write to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.exec_fanout, ExecFanout::AllLinks);
        assert!(config.flush_globals_before_run);
        assert!(config.min_delay_secs > 0.0);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_ron("(exec_fanout: FirstLink, max_exec_depth: 8)").unwrap();
        assert_eq!(config.exec_fanout, ExecFanout::FirstLink);
        assert_eq!(config.max_exec_depth, 8);
        assert!(config.validate_before_run);
    }

    #[test]
    fn test_serialization() {
        let config = EngineConfig {
            flush_globals_before_run: false,
            ..EngineConfig::default()
        };
        let ron_str = config.to_ron().unwrap();
        let loaded = EngineConfig::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_source() {
        assert!(matches!(EngineConfig::from_ron("(max_exec_depth: \"x\")"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = EngineConfig::load(Path::new("does/not/exist.ron")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
