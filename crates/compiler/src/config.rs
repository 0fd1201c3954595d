//! Optional TOML configuration for the optimizer.
//!
//! ```toml
//! passes = ["scalar-replacement"]
//!
//! [scalar-replacement]
//! max-num-elements = 16
//! scalarize-vectors-and-matrices = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OptimizerOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Passes to run in order; the standard pipeline when empty
    #[serde(default)]
    pub passes: Vec<String>,
    #[serde(default, rename = "scalar-replacement")]
    pub scalar_replacement: ScalarReplacementSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ScalarReplacementSection {
    pub max_num_elements: Option<usize>,
    pub scalarize_vectors_and_matrices: Option<bool>,
}

impl OptimizerConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_file_content(&content)
    }

    pub fn from_file_content(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| {
            log::error!("Failed to parse TOML: {e}");
            e
        })?;
        Ok(config)
    }

    /// Options with the file's values applied over the defaults
    pub fn into_options(self) -> OptimizerOptions {
        let mut options = OptimizerOptions {
            passes: self.passes,
            ..OptimizerOptions::default()
        };
        let sroa = &mut options.pass_options.scalar_replacement;
        if let Some(max) = self.scalar_replacement.max_num_elements {
            sroa.max_num_elements = max;
        }
        if let Some(flag) = self.scalar_replacement.scalarize_vectors_and_matrices {
            sroa.scalarize_vectors_and_matrices = flag;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = OptimizerConfig::from_file_content(
            "passes = [\"scalar-replacement\"]\n[scalar-replacement]\nmax-num-elements = 3\n",
        )
        .unwrap();
        assert_eq!(config.passes, vec!["scalar-replacement".to_string()]);
        assert_eq!(config.scalar_replacement.max_num_elements, Some(3));

        let options = config.into_options();
        assert_eq!(options.pass_options.scalar_replacement.max_num_elements, 3);
        assert!(!options.pass_options.scalar_replacement.scalarize_vectors_and_matrices);
    }

    #[test]
    fn test_empty_config_keeps_defaults() {
        let options = OptimizerConfig::from_file_content("").unwrap().into_options();
        assert_eq!(options, OptimizerOptions::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(OptimizerConfig::from_file_content("[scalar-replacement]\nmax = 3\n").is_err());
        assert!(OptimizerConfig::from_file_content("pases = []\n").is_err());
    }
}
