//! Deckforge Core - topic-to-slide-deck pipeline.
//!
//! Deckforge turns a topic string into a `.pptx` presentation by chaining
//! three external collaborators behind narrow interfaces:
//!
//! ```text
//! Topic → LlmProvider (summary, code, slide outline) → PhotoSource (one picture
//!       per image suggestion) → DocumentAssembler → presentation file
//! ```
//!
//! Every stage degrades to placeholder content instead of failing, so a
//! request produces a deck even when a service misbehaves.
//!
//! # Usage
//!
//! ```rust,ignore
//! use deckforge_core::{Config, DeckGenerator, GenerateRequest};
//!
//! #[tokio::main]
//! async fn main() -> deckforge_core::Result<()> {
//!     let generator = DeckGenerator::new(Config::load()?)?;
//!     let outcome = generator.generate(&GenerateRequest::new("Tide pools")).await?;
//!     println!("Wrote {}", outcome.artifact.path.display());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deck;
pub mod error;
pub mod llm;
pub mod outline;
pub mod output;
pub mod photos;
pub mod pipeline;
pub mod types;

pub use config::Config;
pub use deck::DocumentAssembler;
pub use error::{ConfigError, DeckError, DocumentError, PipelineError, PipelineResult, Result};
pub use llm::{LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse, TextGenerator};
pub use outline::{OutlineExtractor, OutlineOptions};
pub use output::{OutputFormat, RecordWriter};
pub use photos::{ImageFetcher, PhotoCandidate, PhotoSource};
pub use pipeline::{DeckGenerator, GenerateRequest};
pub use types::{AssemblyReport, GenerationOutcome, ImageAsset, PresentationArtifact, TopicRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
