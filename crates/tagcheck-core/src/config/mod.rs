//! Configuration management for tagcheck.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section is optional in the file.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for tagcheck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Column names in tabular inputs
    pub columns: ColumnsConfig,

    /// Metrics engine settings
    pub metrics: MetricsConfig,

    /// Corpus audit settings
    pub audit: AuditConfig,

    /// Classification settings
    pub classify: ClassifyConfig,

    /// Retry settings
    pub pipeline: PipelineConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// SFT dataset export settings
    pub dataset: DatasetConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// LLM provider settings
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.tagcheck.tagcheck/config.toml
    /// - Linux: ~/.config/tagcheck/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\tagcheck\config\config.toml
    ///
    /// Falls back to ~/.tagcheck/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tagcheck", "tagcheck")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".tagcheck").join("config.toml")
            })
    }

    /// Resolved taxonomy file path (with ~ expansion), if one is configured.
    pub fn taxonomy_path(&self) -> Option<PathBuf> {
        self.classify
            .taxonomy
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DuplicatePolicy;
    use crate::taxonomy::PromptStyle;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.columns.ground_truth, "tag_gt");
        assert_eq!(config.columns.predictions, "inference_result");
        assert_eq!(config.classify.parallel, 4);
        assert_eq!(config.classify.max_labels, 5);
        assert_eq!(config.metrics.duplicate_policy, DuplicatePolicy::Deduplicate);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[columns]"));
        assert!(toml.contains("[classify]"));
        assert!(toml.contains("duplicate_policy = \"deduplicate\""));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [columns]
            ground_truth = "label"

            [metrics]
            duplicate_policy = "per_occurrence"
            "#,
        )
        .unwrap();
        assert_eq!(config.columns.ground_truth, "label");
        assert_eq!(config.columns.predictions, "inference_result");
        assert_eq!(
            config.metrics.duplicate_policy,
            DuplicatePolicy::PerOccurrence
        );
        assert_eq!(config.audit.top_dimensions, 20);
    }

    #[test]
    fn test_prompt_styles_per_command() {
        let config = Config::default();
        assert_eq!(config.classify.prompt_style, PromptStyle::Recall);
        assert_eq!(config.dataset.prompt_style, PromptStyle::Precise);

        let config = Config::from_toml("[classify]\nprompt_style = \"precise\"\n").unwrap();
        assert_eq!(config.classify.prompt_style, PromptStyle::Precise);
    }

    #[test]
    fn test_openai_endpoint_defaults_when_omitted() {
        let config = Config::from_toml(
            r#"
            [llm.openai]
            api_key = "sk-test"
            model = "gpt-4o"
            "#,
        )
        .unwrap();
        let openai = config.llm.openai.unwrap();
        assert_eq!(openai.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[classify]\nparallel = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("classify.parallel"));
    }

    #[test]
    fn test_taxonomy_path_expands_tilde() {
        let mut config = Config::default();
        assert!(config.taxonomy_path().is_none());
        config.classify.taxonomy = Some("/etc/tagcheck/taxonomy.toml".to_string());
        assert_eq!(
            config.taxonomy_path(),
            Some(PathBuf::from("/etc/tagcheck/taxonomy.toml"))
        );
    }
}
