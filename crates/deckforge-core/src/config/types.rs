//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where generated presentations are written
    pub output_dir: PathBuf,

    /// Working directory for downloaded pictures (cleared after each deck)
    pub image_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("static/presentations"),
            image_dir: PathBuf::from("images"),
        }
    }
}

/// HTTP front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Outline extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Number of summary sentences requested from the model
    pub summary_sentences: usize,

    /// Language requested for the optional code snippet
    pub code_language: String,

    /// Pause after the summary/code calls of a topic when several topics run
    pub topic_delay_secs: u64,

    /// Pause after the structuring call of a topic when several topics run
    pub structure_delay_secs: u64,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            summary_sentences: 10,
            code_language: "python".to_string(),
            topic_delay_secs: 55,
            structure_delay_secs: 20,
        }
    }
}

/// Retry settings for text generation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max retry attempts for transient LLM failures (0 = single attempt)
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 0,
            retry_delay_ms: 1000,
        }
    }
}

/// Timeouts for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// LLM call timeout in milliseconds
    pub llm_timeout_ms: u64,

    /// Photo search and download timeout in milliseconds
    pub photo_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            llm_timeout_ms: 60_000,
            photo_timeout_ms: 30_000,
        }
    }
}

/// Stock photo search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotosConfig {
    /// Pexels API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Search endpoint
    pub endpoint: String,

    /// Candidates requested per image suggestion
    pub per_suggestion: usize,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            api_key: "${PEXELS_API_KEY}".to_string(),
            endpoint: "https://api.pexels.com/v1/search".to_string(),
            per_suggestion: 1,
        }
    }
}

/// Presentation template lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory holding the template decks
    pub dir: PathBuf,

    /// Registered templates, looked up by id
    pub entries: Vec<TemplateEntry>,
}

/// One selectable template deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Key sent by clients as `template`
    pub id: u32,

    /// File name inside the template directory
    pub file: String,
}

impl TemplateEntry {
    /// Display name derived from the file name ("dark.pptx" → "Dark").
    pub fn display_name(&self) -> String {
        let stem = self.file.trim_end_matches(".pptx");
        let mut chars = stem.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        let entries = [
            (1, "minimalistic.pptx"),
            (2, "colourful.pptx"),
            (3, "professional.pptx"),
            (4, "dark.pptx"),
        ]
        .into_iter()
        .map(|(id, file)| TemplateEntry {
            id,
            file: file.to_string(),
        })
        .collect();

        Self {
            dir: PathBuf::from("template"),
            entries,
        }
    }
}

/// How generated files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactNaming {
    /// `presentation_NNNN.pptx` with a random four-digit suffix
    Random,
    /// Always `presentation.pptx`, overwritten by each run
    Fixed,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Artifact naming scheme
    pub naming: ArtifactNaming,

    /// Pretty-print JSON written by the `outline` command
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            naming: ArtifactNaming::Random,
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Active provider: "gemini", "openai", "anthropic" or "ollama"
    pub provider: String,

    /// Google Gemini configuration
    pub gemini: Option<GeminiConfig>,

    /// OpenAI (or compatible) configuration
    pub openai: Option<OpenAiConfig>,

    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,

    /// Ollama (local) configuration
    pub ollama: Option<OllamaConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            gemini: None,
            openai: None,
            anthropic: None,
            ollama: None,
        }
    }
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API base, without the `/models/...` suffix
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${GEMINI_API_KEY}".to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Chat completions endpoint (any OpenAI-compatible server)
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
        }
    }
}
