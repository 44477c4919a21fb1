//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let columns = [
            ("columns.ground_truth", &self.columns.ground_truth),
            ("columns.predictions", &self.columns.predictions),
            ("columns.image", &self.columns.image),
            ("columns.filename", &self.columns.filename),
            ("columns.flag", &self.columns.flag),
        ];
        for (key, value) in columns {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must not be empty"
                )));
            }
        }
        if self.classify.parallel == 0 {
            return Err(ConfigError::ValidationError(
                "classify.parallel must be > 0".into(),
            ));
        }
        if self.classify.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "classify.max_tokens must be > 0".into(),
            ));
        }
        if self.classify.max_labels == 0 {
            return Err(ConfigError::ValidationError(
                "classify.max_labels must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.classify.temperature) {
            return Err(ConfigError::ValidationError(
                "classify.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.audit.large_file_mb <= 0.0 {
            return Err(ConfigError::ValidationError(
                "audit.large_file_mb must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.fetch_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.fetch_timeout_ms must be > 0".into(),
            ));
        }
        if !matches!(
            self.logging.level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of error, warn, info, debug, trace (got '{}')",
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel() {
        let mut config = Config::default();
        config.classify.parallel = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("classify.parallel"));
    }

    #[test]
    fn test_validate_rejects_empty_column_name() {
        let mut config = Config::default();
        config.columns.predictions = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("columns.predictions"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.llm_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_invalid_temperature() {
        let mut config = Config::default();
        config.classify.temperature = 2.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));

        config.classify.temperature = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_validate_rejects_non_positive_large_file_threshold() {
        let mut config = Config::default();
        config.audit.large_file_mb = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("large_file_mb"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }
}
