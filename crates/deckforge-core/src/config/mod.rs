//! Configuration management for Deckforge.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section implements `Default`, so a missing file or a
//! partial file both work.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Deckforge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP front end settings
    pub server: ServerConfig,

    /// Outline extraction settings
    pub outline: OutlineConfig,

    /// Retry settings
    pub pipeline: PipelineConfig,

    /// Upstream timeouts
    pub limits: LimitsConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Stock photo settings
    pub photos: PhotosConfig,

    /// Presentation templates
    pub templates: TemplatesConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
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
    /// - macOS: ~/Library/Application Support/com.deckforge.deckforge/config.toml
    /// - Linux: ~/.config/deckforge/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\deckforge\config\config.toml
    ///
    /// Falls back to ~/.deckforge/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "deckforge", "deckforge")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".deckforge").join("config.toml")
            })
    }

    /// Resolved output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        expand(&self.general.output_dir)
    }

    /// Resolved working image directory (with ~ expansion).
    pub fn image_dir(&self) -> PathBuf {
        expand(&self.general.image_dir)
    }

    /// Resolved template directory (with ~ expansion).
    pub fn template_dir(&self) -> PathBuf {
        expand(&self.templates.dir)
    }

    /// Path of the template registered under `id`, if any.
    ///
    /// The file may not exist; the assembler checks that and falls back to a
    /// blank deck.
    pub fn template_path(&self, id: u32) -> Option<PathBuf> {
        self.templates
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| self.template_dir().join(&entry.file))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
