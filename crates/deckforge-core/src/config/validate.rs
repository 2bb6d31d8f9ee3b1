//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const KNOWN_PROVIDERS: &[&str] = &["gemini", "openai", "anthropic", "ollama"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.outline.summary_sentences == 0 {
            return Err(ConfigError::ValidationError(
                "outline.summary_sentences must be > 0".into(),
            ));
        }
        if self.outline.code_language.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "outline.code_language must not be empty".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.photo_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.photo_timeout_ms must be > 0".into(),
            ));
        }
        if self.photos.per_suggestion == 0 {
            return Err(ConfigError::ValidationError(
                "photos.per_suggestion must be > 0".into(),
            ));
        }
        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "llm.provider must be one of {}, got '{}'",
                KNOWN_PROVIDERS.join(", "),
                self.llm.provider
            )));
        }
        if self.general.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "general.output_dir must not be empty".into(),
            ));
        }
        if self.general.image_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "general.image_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}
