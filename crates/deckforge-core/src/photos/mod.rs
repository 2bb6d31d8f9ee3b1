//! Stock photo lookup for image suggestions.
//!
//! A [`PhotoSource`] knows how to search and download; the [`ImageFetcher`]
//! turns outline text into one local picture (or a gap) per suggestion.

pub mod fetcher;
pub mod pexels;

pub use fetcher::{suggestions, FetchOptions, ImageFetcher};
pub use pexels::PexelsSource;

use crate::error::PipelineResult;
use async_trait::async_trait;
use std::path::Path;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCandidate {
    /// Full-resolution image URL
    pub url: String,
    /// Alt text reported by the API, if any
    pub alt: Option<String>,
}

/// A photo search backend.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Whether credentials are configured.
    fn is_available(&self) -> bool;

    /// Search for up to `per_page` candidates.
    async fn search(&self, query: &str, per_page: usize) -> PipelineResult<Vec<PhotoCandidate>>;

    /// Download `url` to `dest`.
    ///
    /// Implementations must refuse non-success statuses and responses whose
    /// `Content-Type` is not an image, without creating `dest`.
    async fn download(&self, url: &str, dest: &Path) -> PipelineResult<()>;
}
