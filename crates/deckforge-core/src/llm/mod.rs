//! LLM integration for outline text generation.
//!
//! Provides a provider abstraction over several backends (Gemini, OpenAI,
//! Anthropic, Ollama) and a [`TextGenerator`] that applies timeouts and
//! retries to every call.

pub(crate) mod anthropic;
pub(crate) mod client;
pub(crate) mod gemini;
pub(crate) mod ollama;
pub(crate) mod openai;
pub(crate) mod provider;
pub(crate) mod retry;

pub use client::{GenerateOptions, TextGenerator};
pub use provider::{resolve_env_var, LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
