//! Category taxonomy for restricted-item classification.
//!
//! The taxonomy is data: grouped categories, each with the label the model
//! must return plus an English gloss, a definition and, for curated entries,
//! key visual features.
//! It drives both the classification system prompt and the SFT dataset
//! system turn, and its labels form the expected vocabulary of ground truth.

mod prompt;

pub use prompt::{
    render_prompt, render_system_prompt, render_user_prompt, PromptStyle, NO_MATCH_LABEL, PREFILL,
    USER_PROMPT,
};

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_TAXONOMY: &str = include_str!("../../assets/taxonomy.toml");

/// One classifiable category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Label returned by the model (and used in ground truth)
    pub label: String,
    /// English name shown next to the label
    pub english: String,
    pub definition: String,
    /// Visual cues that identify the category; empty when not curated
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_features: String,
}

/// A titled group of categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    /// Heading shared by consecutive groups (e.g. "Weapons and Combat Items")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// The full taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub groups: Vec<CategoryGroup>,
}

impl Taxonomy {
    /// The taxonomy shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml(BUILTIN_TAXONOMY)
    }

    /// Load from `path` when given, otherwise fall back to the built-in taxonomy.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                tracing::debug!("Loading taxonomy from {:?}", path);
                Self::load(path)
            }
            None => Self::builtin(),
        }
    }

    /// Load a taxonomy from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a taxonomy from TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let taxonomy: Taxonomy = toml::from_str(content)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// All categories in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.groups.iter().flat_map(|g| g.categories.iter())
    }

    /// All labels in declaration order.
    pub fn labels(&self) -> Vec<&str> {
        self.categories().map(|c| c.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels must be non-empty, unique, and free of the comma separator
    /// used in prediction strings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.is_empty() {
            return Err(ConfigError::ValidationError(
                "taxonomy has no categories".into(),
            ));
        }
        let mut seen = HashSet::new();
        for category in self.categories() {
            let label = category.label.trim();
            if label.is_empty() {
                return Err(ConfigError::ValidationError(
                    "taxonomy contains an empty label".into(),
                ));
            }
            if label.contains(',') {
                return Err(ConfigError::ValidationError(format!(
                    "taxonomy label '{label}' contains a comma"
                )));
            }
            if !seen.insert(label) {
                return Err(ConfigError::ValidationError(format!(
                    "taxonomy label '{label}' is duplicated"
                )));
            }
        }
        Ok(())
    }
}
