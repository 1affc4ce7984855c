//! Configuration for the Fieldflow service.

use anyhow::{Context, Result};
use fieldflow_validator::{Ruleset, RulesetRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldflowConfig {
    /// Path to the SQLite database
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Directory watched for incoming files
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Directory validation reports are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File extension considered by the watcher, without the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Datatype tag assigned to registered files
    #[serde(default = "default_datatype")]
    pub datatype: String,

    /// Watcher polling interval in seconds
    #[serde(default = "default_watch_interval")]
    pub watch_interval_secs: u64,

    /// Registry polling interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Rule tables added on top of the built-in ones; a ruleset with a
    /// built-in datatype tag replaces the built-in.
    #[serde(default)]
    pub rulesets: Vec<Ruleset>,
}

fn default_database_path() -> PathBuf {
    fieldflow_logging::fieldflow_home().join("fieldflow.sqlite3")
}

fn default_watch_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_extension() -> String {
    "csv".to_string()
}

fn default_datatype() -> String {
    "FIELD".to_string()
}

fn default_watch_interval() -> u64 {
    5
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for FieldflowConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            watch_dir: default_watch_dir(),
            output_dir: default_output_dir(),
            extension: default_extension(),
            datatype: default_datatype(),
            watch_interval_secs: default_watch_interval(),
            poll_interval_secs: default_poll_interval(),
            rulesets: Vec::new(),
        }
    }
}

impl FieldflowConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Built-in rulesets overlaid with the configured ones.
    pub fn build_registry(&self) -> RulesetRegistry {
        let mut registry = RulesetRegistry::builtin();
        for ruleset in &self.rulesets {
            registry.insert(ruleset.clone());
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FieldflowConfig::default();
        assert_eq!(config.extension, "csv");
        assert_eq!(config.datatype, "FIELD");
        assert_eq!(config.watch_interval_secs, 5);
        assert_eq!(config.poll_interval_secs, 10);
        assert!(config.rulesets.is_empty());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = FieldflowConfig {
            database_path: PathBuf::from("test.db"),
            watch_dir: PathBuf::from("incoming"),
            output_dir: PathBuf::from("reports"),
            extension: "tsv".to_string(),
            datatype: "FIELD".to_string(),
            watch_interval_secs: 2,
            poll_interval_secs: 4,
            rulesets: Vec::new(),
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: FieldflowConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.watch_dir, config.watch_dir);
        assert_eq!(parsed.extension, "tsv");
        assert_eq!(parsed.poll_interval_secs, 4);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: FieldflowConfig = toml::from_str(r#"watch_dir = "drop""#).unwrap();
        assert_eq!(parsed.watch_dir, PathBuf::from("drop"));
        assert_eq!(parsed.extension, "csv");
    }

    #[test]
    fn test_configured_ruleset_overrides_builtin() {
        let toml = r#"
            [[rulesets]]
            datatype = "FIELD"

            [[rulesets.columns]]
            name = "FieldName"
            kind = "text"
            required = true
        "#;

        let config: FieldflowConfig = toml::from_str(toml).unwrap();
        let registry = config.build_registry();
        let rules = registry.get("FIELD").unwrap();
        assert_eq!(rules.columns.len(), 1);
    }
}
