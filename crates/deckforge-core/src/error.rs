//! Error types for the Deckforge pipeline.
//!
//! Errors are organized by stage. Most pipeline stages degrade to placeholder
//! values instead of returning these, so the variants mainly surface in logs
//! and in the top-level `generate` call when something truly unexpected fails.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Deckforge operations.
#[derive(Error, Debug)]
pub enum DeckError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Presentation document errors
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors from the external-service stages of the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Text generation call failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Photo search call failed
    #[error("Photo search error: {message}")]
    Photo {
        message: String,
        status_code: Option<u16>,
    },

    /// Image download failed
    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

/// Errors raised while reading a template or writing a presentation package.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// ZIP container could not be read or written
    #[error("Package archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A package part contained malformed XML
    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },

    /// A template package is missing a required part
    #[error("Template {path} is unusable: {message}")]
    Template { path: PathBuf, message: String },

    /// Picture bytes could not be decoded or re-encoded
    #[error("Image error for {path}: {message}")]
    Image { path: PathBuf, message: String },

    /// I/O while reading a template or writing the output file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    pub(crate) fn xml(part: &str, err: impl std::fmt::Display) -> Self {
        Self::Xml {
            part: part.to_string(),
            message: err.to_string(),
        }
    }
}

/// Convenience type alias for Deckforge results.
pub type Result<T> = std::result::Result<T, DeckError>;

/// Convenience type alias for pipeline-stage results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Convenience type alias for document results.
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
