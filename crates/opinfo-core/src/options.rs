//! Analysis options

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// A write through one alias is observable through every alias in its cluster
    pub propagate_through_aliases: bool,
    /// Wildcard positions count as potentially aliasing every other position
    pub link_wildcards: bool,
    /// Consult the special-case rule table
    pub apply_special_cases: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            propagate_through_aliases: true,
            link_wildcards: true,
            apply_special_cases: true,
        }
    }
}

impl AnalysisOptions {
    /// Signature and values only; no special cases
    pub fn without_special_cases() -> Self {
        Self {
            apply_special_cases: false,
            ..Self::default()
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("invalid analysis options")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read analysis options from {}", path.display()))?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_conservative() {
        let options = AnalysisOptions::default();
        assert!(options.propagate_through_aliases);
        assert!(options.link_wildcards);
        assert!(options.apply_special_cases);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let options = AnalysisOptions::from_json_str(r#"{"link_wildcards": false}"#).unwrap();
        assert!(!options.link_wildcards);
        assert!(options.propagate_through_aliases);
        assert!(options.apply_special_cases);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = AnalysisOptions::from_json_str("{not json").unwrap_err();
        assert!(err.to_string().contains("invalid analysis options"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"apply_special_cases": false}}"#).unwrap();

        let options = AnalysisOptions::from_file(file.path()).unwrap();
        assert_eq!(options, AnalysisOptions::without_special_cases());
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = AnalysisOptions::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
