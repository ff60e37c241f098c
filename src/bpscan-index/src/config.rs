//! Index configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Ceiling on diagnostics kept across all files
    pub max_diagnostics_total: usize,
    /// Ceiling on diagnostics kept for any one file
    pub max_diagnostics_per_file: usize,
    /// Hops allowed when walking base classes for a config section name
    pub config_name_depth_limit: usize,
    /// Decode files on the rayon pool
    pub parallel: bool,
    /// Where the index snapshot is flushed, if anywhere
    pub snapshot_path: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_diagnostics_total: 100,
            max_diagnostics_per_file: 5,
            config_name_depth_limit: 100,
            parallel: true,
            snapshot_path: None,
        }
    }
}

impl IndexConfig {
    /// Load configuration from file, or defaults if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = IndexConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, IndexConfig::default());
        assert_eq!(config.max_diagnostics_total, 100);
        assert_eq!(config.max_diagnostics_per_file, 5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bpscan.toml");
        let config = IndexConfig {
            parallel: false,
            snapshot_path: Some(PathBuf::from("/tmp/index.json")),
            ..IndexConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(IndexConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bpscan.toml");
        fs::write(&path, "max_diagnostics_per_file = 2\n").unwrap();
        let config = IndexConfig::load(&path).unwrap();
        assert_eq!(config.max_diagnostics_per_file, 2);
        assert_eq!(config.max_diagnostics_total, 100);
        assert!(config.parallel);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bpscan.toml");
        fs::write(&path, "parallel = \"sometimes\"\n").unwrap();
        let err = IndexConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
