//! # Settings Module
//!
//! ## Purpose
//! Translator configuration: which external expansion tool to run and how, which
//! canonicalization backend to use, logging verbosity and the simulation defaults the
//! simulation-format emitter falls back on when the source does not set them.
//!
//! ## Configuration File
//! JSON document, `kirulenet_config.json` in the working directory unless a path is given.
//! A missing file yields the defaults; a file that exists but does not parse is an error.
//! ```json
//! {
//!   "expansion_tool": "BNG2.pl",
//!   "expansion_args": [],
//!   "expansion_timeout_secs": null,
//!   "oracle": "native",
//!   "verbosity": 1,
//!   "log_file": null,
//!   "keep_intermediate": false,
//!   "simulation": {
//!     "iterations": "1000",
//!     "time_step": "1e-6",
//!     "output_step": "1e-6",
//!     "default_release_object": "world"
//!   }
//! }
//! ```
//! Fields left out of the file take their default values.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "kirulenet_config.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Values the simulation-format emitter uses when the source leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub iterations: String,
    pub time_step: String,
    pub output_step: String,
    /// scene object seeds without a compartment are released into
    pub default_release_object: String,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            iterations: "1000".to_string(),
            time_step: "1e-6".to_string(),
            output_step: "1e-6".to_string(),
            default_release_object: "world".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// network-expansion executable
    pub expansion_tool: String,
    /// extra arguments placed before the input file
    pub expansion_args: Vec<String>,
    /// bounded wait for the expansion tool; `None` waits for as long as it runs
    pub expansion_timeout_secs: Option<u64>,
    /// canonicalization backend name
    pub oracle: String,
    /// 0 = warnings only ... 3 = trace
    pub verbosity: u8,
    pub log_file: Option<String>,
    /// keep the rule-language file and interchange documents next to the output
    pub keep_intermediate: bool,
    pub simulation: SimulationSettings,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            expansion_tool: "BNG2.pl".to_string(),
            expansion_args: Vec::new(),
            expansion_timeout_secs: None,
            oracle: "native".to_string(),
            verbosity: 1,
            log_file: None,
            keep_intermediate: false,
            simulation: SimulationSettings::default(),
        }
    }
}

impl TranslatorConfig {
    /// Loads the config from `path`, or the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SettingsError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// `kirulenet_config.json` in the working directory
    pub fn load_default() -> Result<Self, SettingsError> {
        Self::load(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Writes the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Json {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = TranslatorConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, TranslatorConfig::default());
        assert_eq!(config.expansion_tool, "BNG2.pl");
        assert_eq!(config.oracle, "native");
        assert_eq!(config.expansion_timeout_secs, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let mut config = TranslatorConfig::default();
        config.expansion_timeout_secs = Some(30);
        config.keep_intermediate = true;
        config.simulation.iterations = "5000".to_string();
        config.save(&path).unwrap();
        assert_eq!(TranslatorConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "verbosity": 3, "simulation": { "time_step": "5e-7" } }"#).unwrap();
        let config = TranslatorConfig::load(&path).unwrap();
        assert_eq!(config.verbosity, 3);
        assert_eq!(config.simulation.time_step, "5e-7");
        assert_eq!(config.simulation.iterations, "1000");
        assert_eq!(config.expansion_tool, "BNG2.pl");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ verbosity: ").unwrap();
        assert!(matches!(
            TranslatorConfig::load(&path),
            Err(SettingsError::Json { .. })
        ));
    }
}
