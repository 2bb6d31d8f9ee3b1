//! Subcommand implementations.

pub mod config;
pub mod generate;
pub mod outline;
pub mod serve;

use clap::ValueEnum;

/// Text generation backends selectable from the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LlmChoice {
    /// Google Gemini
    Gemini,
    /// OpenAI or a compatible endpoint
    Openai,
    /// Anthropic API
    Anthropic,
    /// Local Ollama instance
    Ollama,
}

impl std::fmt::Display for LlmChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmChoice::Gemini => write!(f, "gemini"),
            LlmChoice::Openai => write!(f, "openai"),
            LlmChoice::Anthropic => write!(f, "anthropic"),
            LlmChoice::Ollama => write!(f, "ollama"),
        }
    }
}

/// Apply a `--llm` override to the loaded configuration.
pub fn apply_llm_override(config: &mut deckforge_core::Config, choice: Option<LlmChoice>) {
    if let Some(choice) = choice {
        config.llm.provider = choice.to_string();
    }
}
