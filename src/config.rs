//! Pipeline configuration.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where to read the CSVs and where to write charts and the deck.
///
/// Any field left out of a JSON config file keeps its default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub base_path: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("archive"),
            output_dir: PathBuf::from("charts"),
            output_name: PathBuf::from("Olist_Consulting_Deck.pptx"),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.output_dir.join("metrics.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("olist.json");
        fs::write(&path, r#"{ "base_path": "/data/olist" }"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();

        assert_eq!(config.base_path, PathBuf::from("/data/olist"));
        assert_eq!(config.output_dir, PathBuf::from("charts"));
        assert_eq!(config.output_name, PathBuf::from("Olist_Consulting_Deck.pptx"));
        assert_eq!(config.metrics_path(), PathBuf::from("charts/metrics.json"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("olist.json");
        fs::write(&path, r#"{ "chart_dir": "out" }"#).unwrap();

        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&dir.path().join("nope.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
