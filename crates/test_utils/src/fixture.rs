//! Assembly fixtures with TOML front matter.
//!
//! Lines starting with `;;` form a TOML document describing what running
//! the optimizer on the fixture should do. The assembler reads them as
//! comments.
//!
//! ```text
//! ;; [expect]
//! ;; status = "changed"
//! ;; variables = 2
//! ;;
//! ;; [run]
//! ;; function = "main"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedStatus {
    #[default]
    Changed,
    Unchanged,
    Failure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureConfig {
    #[serde(default)]
    pub expect: ExpectSection,
    #[serde(default)]
    pub pass: PassSection,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectSection {
    #[serde(default)]
    pub status: ExpectedStatus,
    /// Function-storage variables left in the first function
    pub variables: Option<usize>,
    /// Substring of the pass error, for failing fixtures
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassSection {
    #[serde(rename = "max-num-elements")]
    pub max_num_elements: Option<usize>,
    #[serde(rename = "scalarize-vectors-and-matrices")]
    pub scalarize_vectors_and_matrices: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSection {
    /// Function whose result must not change under optimization
    pub function: Option<String>,
}

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid front matter in {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Fixture {
    /// Path relative to `test_data/`
    pub name: String,
    pub source: String,
    pub config: FixtureConfig,
}

impl Fixture {
    /// Loads a fixture given relative to `test_data/`
    pub fn load(name: &str) -> Result<Self, FixtureError> {
        let path = crate::fixture_path(name);
        let source = std::fs::read_to_string(&path).map_err(|source| FixtureError::Io {
            path: path.clone(),
            source,
        })?;
        let config =
            parse_front_matter(&source).map_err(|source| FixtureError::Config { path, source })?;
        Ok(Self {
            name: name.to_string(),
            source,
            config,
        })
    }
}

/// Reads the `;;` lines of `source` as a [`FixtureConfig`]
pub fn parse_front_matter(source: &str) -> Result<FixtureConfig, toml::de::Error> {
    let document: Vec<&str> = source
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix(";;"))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect();
    toml::from_str(&document.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter() {
        let config = parse_front_matter(
            ";; [expect]\n;; status = \"failure\"\n;; error = \"out of range\"\n;; [pass]\n;; max-num-elements = 4\nOpCapability Shader\n",
        )
        .unwrap();
        assert_eq!(config.expect.status, ExpectedStatus::Failure);
        assert_eq!(config.expect.error.as_deref(), Some("out of range"));
        assert_eq!(config.pass.max_num_elements, Some(4));
        assert_eq!(config.run.function, None);
    }

    #[test]
    fn test_missing_front_matter_uses_defaults() {
        let config = parse_front_matter("; plain comment\nOpCapability Shader\n").unwrap();
        assert_eq!(config.expect.status, ExpectedStatus::Changed);
        assert_eq!(config.expect.variables, None);
    }

    #[test]
    fn test_invalid_front_matter() {
        assert!(parse_front_matter(";; [expect]\n;; status = \"sometimes\"\n").is_err());
    }
}
