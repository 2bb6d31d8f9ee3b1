//! Core data types for the Deckforge pipeline.
//!
//! These types carry a topic from outline extraction through to the written
//! presentation file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outline content generated for one topic.
///
/// Fields are filled by the outline extractor; parse failures are recorded
/// as diagnostic placeholder strings, so `topic` and `summary` are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Title line chosen by the model (or a diagnostic placeholder)
    pub topic: String,

    /// Ordered `[Summary Sentence N: ...]` lines
    pub summary: Vec<String>,

    /// Code snippet, present only when one was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Slide outline text (`---` separated blocks); empty until structured
    #[serde(default)]
    pub slides: String,
}

impl TopicRecord {
    /// Whether the summary stage produced a diagnostic record instead of content.
    pub fn is_fallback(&self) -> bool {
        self.topic.starts_with(crate::outline::TOPIC_FALLBACK_PREFIX)
    }
}

/// One downloaded stock photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// The image suggestion the photo was searched for
    pub suggestion: String,

    /// Where the bytes were written
    pub local_path: PathBuf,
}

/// A presentation file written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationArtifact {
    /// Identifier used in download URLs (file stem)
    pub id: String,

    /// File name inside the output directory
    pub filename: String,

    /// Full path to the written file
    pub path: PathBuf,
}

impl PresentationArtifact {
    /// Build an artifact record from its id and output directory.
    pub fn in_dir(dir: &std::path::Path, id: &str) -> Self {
        let filename = format!("{id}.pptx");
        Self {
            id: id.to_string(),
            path: dir.join(&filename),
            filename,
        }
    }
}

/// What the document assembler produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    /// Total slides written, including the title slide
    pub slide_count: usize,

    /// Pictures actually placed on slides
    pub pictures_placed: usize,

    /// Image suggestions that had no usable picture
    pub pictures_skipped: usize,
}

/// Outcome of one full generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub artifact: PresentationArtifact,
    pub report: AssemblyReport,
    pub elapsed_ms: u64,
}
