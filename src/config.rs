//! Engine configuration and its TOML file format.
//!
//! ```toml
//! preset = "strict"          # optional: default | reference | strict
//! join_strategy = "hash"     # auto | nested_loop | hash
//! natural_fallback = "reject"
//! max_rows = 100000
//! ```
//!
//! Keys present in the file override the chosen preset.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physical algorithm used to enumerate matching pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Hash join whenever the condition is pure equality, nested loop otherwise.
    #[default]
    Auto,
    /// Always nested loop.
    NestedLoop,
    /// Hash join; conditions that are not pure equality still use nested loop.
    Hash,
}

/// Behavior of a NATURAL join whose inputs share no column names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaturalFallback {
    /// Every pair matches: the cartesian product, as SQL specifies.
    #[default]
    CrossProduct,
    /// Fail with `AmbiguousJoin`.
    Reject,
}

/// Options consulted by the join evaluator and executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Enumeration algorithm.
    pub join_strategy: JoinStrategy,
    /// NATURAL join without shared columns.
    pub natural_fallback: NaturalFallback,
    /// Upper bound on rows a single query may return.
    pub max_rows: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            join_strategy: JoinStrategy::Auto,
            natural_fallback: NaturalFallback::CrossProduct,
            max_rows: None,
        }
    }
}

impl EngineConfig {
    /// Nested-loop only; the reference enumeration every other strategy must match.
    pub fn reference() -> Self {
        Self {
            join_strategy: JoinStrategy::NestedLoop,
            ..Self::default()
        }
    }

    /// Rejects NATURAL joins without shared columns.
    pub fn strict() -> Self {
        Self {
            natural_fallback: NaturalFallback::Reject,
            ..Self::default()
        }
    }

    /// Returns the preset called `name`.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "reference" => Some(Self::reference()),
            "strict" => Some(Self::strict()),
            _ => None,
        }
    }

    /// Loads the configuration from `explicit`, or from the default location
    /// when `None`. A missing file yields [`EngineConfig::default`].
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let Some(path) = explicit.or_else(default_config_path) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        read_file(&path)
    }

    /// Parses configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|source| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        raw.resolve()
    }
}

fn read_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    raw.resolve()
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    preset: Option<String>,
    #[serde(default)]
    join_strategy: Option<JoinStrategy>,
    #[serde(default)]
    natural_fallback: Option<NaturalFallback>,
    #[serde(default)]
    max_rows: Option<usize>,
}

impl RawConfig {
    fn resolve(self) -> Result<EngineConfig, ConfigError> {
        let mut config = match self.preset.as_deref() {
            Some(name) => EngineConfig::preset(name).ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
            })?,
            None => EngineConfig::default(),
        };
        if let Some(strategy) = self.join_strategy {
            config.join_strategy = strategy;
        }
        if let Some(fallback) = self.natural_fallback {
            config.natural_fallback = fallback;
        }
        if self.max_rows.is_some() {
            config.max_rows = self.max_rows;
        }
        Ok(config)
    }
}

/// Errors raised while loading the engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read engine config {path}: {source}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this format.
    #[error("failed to parse engine config {path}: {source}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// `preset` names no known preset.
    #[error("unknown engine preset '{name}'")]
    UnknownPreset {
        /// Preset name from the file.
        name: String,
    },
}

/// `<config dir>/reljoin/engine.toml`, when the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("reljoin").join("engine.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_keys_override_the_preset() -> Result<(), ConfigError> {
        let config = EngineConfig::from_toml_str(
            "preset = \"strict\"\njoin_strategy = \"nested_loop\"\nmax_rows = 10\n",
        )?;
        assert_eq!(config.natural_fallback, NaturalFallback::Reject);
        assert_eq!(config.join_strategy, JoinStrategy::NestedLoop);
        assert_eq!(config.max_rows, Some(10));
        Ok(())
    }

    #[test]
    fn empty_file_is_the_default() -> Result<(), ConfigError> {
        assert_eq!(EngineConfig::from_toml_str("")?, EngineConfig::default());
        Ok(())
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let err = EngineConfig::from_toml_str("preset = \"fastest\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset { .. }));
    }

    #[test]
    fn load_reads_explicit_path_and_tolerates_missing_file() -> Result<(), ConfigError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        assert_eq!(EngineConfig::load(Some(missing))?, EngineConfig::default());

        let path = dir.path().join("engine.toml");
        fs::write(&path, "natural_fallback = \"reject\"\n").expect("write config");
        let config = EngineConfig::load(Some(path))?;
        assert_eq!(config.natural_fallback, NaturalFallback::Reject);
        Ok(())
    }
}
