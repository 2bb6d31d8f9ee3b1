//! Per-suggestion photo download into a working directory.

use super::PhotoSource;
use crate::config::Config;
use crate::error::PipelineError;
use crate::types::ImageAsset;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// Horizontal whitespace only: an empty suggestion must not capture the next line.
static SUGGESTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Image Suggestion:[ \t]*(\S.*)").expect("suggestion pattern is valid")
});

/// Every non-empty image suggestion in outline text, in order of appearance.
pub fn suggestions(outline: &str) -> Vec<String> {
    SUGGESTION_RE
        .captures_iter(outline)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Local file name for a remote URL: the path basename, query and fragment stripped.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query.rsplit('/').next().unwrap_or("");
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        None
    } else {
        Some(name.to_string())
    }
}

/// Fetcher settings, usually from `[photos]` and `[limits]`.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Candidates requested per suggestion
    pub per_suggestion: usize,
    /// Deadline for each search and each download
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            per_suggestion: 1,
            timeout: Duration::from_secs(30),
        }
    }
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            per_suggestion: config.photos.per_suggestion,
            timeout: Duration::from_millis(config.limits.photo_timeout_ms),
        }
    }
}

/// Downloads pictures for image suggestions into one working directory.
#[derive(Clone)]
pub struct ImageFetcher {
    source: Arc<dyn PhotoSource>,
    image_dir: PathBuf,
    options: FetchOptions,
}

impl ImageFetcher {
    pub fn new(source: Box<dyn PhotoSource>, image_dir: PathBuf, options: FetchOptions) -> Self {
        Self {
            source: Arc::from(source),
            image_dir,
            options,
        }
    }

    /// Same source and options, different working directory.
    pub fn in_dir(&self, image_dir: PathBuf) -> Self {
        Self {
            source: self.source.clone(),
            image_dir,
            options: self.options.clone(),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Search for `query` and download up to `n` results.
    ///
    /// Returns the local paths that downloaded successfully, in result order.
    /// Search failures, empty results and individual download failures are
    /// logged and yield fewer (or no) paths.
    pub async fn get_images(&self, query: &str, n: usize) -> Vec<PathBuf> {
        let candidates = match self
            .with_deadline("photo search", self.source.search(query, n))
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Error fetching images for query '{query}': {e}");
                return Vec::new();
            }
        };

        if candidates.is_empty() {
            tracing::info!("No images found for query: {query}");
            return Vec::new();
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.image_dir).await {
            tracing::warn!("Cannot create image directory {:?}: {e}", self.image_dir);
            return Vec::new();
        }

        let mut paths = Vec::new();
        for (i, candidate) in candidates.into_iter().take(n).enumerate() {
            let name = file_name_from_url(&candidate.url).unwrap_or_else(|| format!("image_{i}"));
            let dest = self.image_dir.join(name);

            match self
                .with_deadline("photo download", self.source.download(&candidate.url, &dest))
                .await
            {
                Ok(()) => {
                    tracing::debug!("Downloaded {} -> {:?}", candidate.url, dest);
                    paths.push(dest);
                }
                Err(e) => tracing::warn!("Skipping {}: {e}", candidate.url),
            }
        }
        paths
    }

    /// One fetch per suggestion in `outline`, aligned with suggestion order.
    ///
    /// A suggestion without a usable picture leaves a `None` in its slot so
    /// later pictures stay attached to their own slides.
    pub async fn fetch_for_outline(&self, outline: &str) -> Vec<Option<ImageAsset>> {
        let mut assets = Vec::new();
        for suggestion in suggestions(outline) {
            let local_path = self
                .get_images(&suggestion, self.options.per_suggestion)
                .await
                .into_iter()
                .next();
            if local_path.is_none() {
                tracing::info!("No image found for suggestion: {suggestion}");
            }
            assets.push(local_path.map(|local_path| ImageAsset {
                suggestion,
                local_path,
            }));
        }
        assets
    }

    /// Delete every file in the working directory.
    ///
    /// Returns how many files were removed. A missing directory counts as empty.
    pub fn empty_images(&self) -> std::io::Result<usize> {
        let entries = match std::fs::read_dir(&self.image_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        tracing::debug!("Image directory {:?} cleaned ({removed} files)", self.image_dir);
        Ok(removed)
    }

    async fn with_deadline<T>(
        &self,
        stage: &str,
        fut: impl std::future::Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        let timeout = self.options.timeout;
        tokio::time::timeout(timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(PipelineError::Timeout {
                    stage: stage.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory photo source for fetcher and pipeline tests.

    use super::*;
    use crate::error::PipelineResult;
    use crate::photos::PhotoCandidate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Minimal 1x1 PNG.
    pub(crate) const TINY_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0xF8,
        0xCF, 0xC0, 0xF0, 0x1F, 0x00, 0x05, 0x00, 0x01, 0xFF, 0x89, 0x99, 0x3D, 0x1D, 0x00, 0x00,
        0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// Answers each query with `https://photos.test/<slug>.png` unless the
    /// query contains one of the `missing` words.
    pub(crate) struct MockPhotoSource {
        missing: Vec<String>,
        pub(crate) searches: Arc<AtomicU32>,
        pub(crate) queries: Arc<Mutex<Vec<String>>>,
        fail_downloads: bool,
    }

    impl MockPhotoSource {
        pub(crate) fn new() -> Self {
            Self {
                missing: Vec::new(),
                searches: Arc::new(AtomicU32::new(0)),
                queries: Arc::new(Mutex::new(Vec::new())),
                fail_downloads: false,
            }
        }

        pub(crate) fn missing(mut self, word: &str) -> Self {
            self.missing.push(word.to_string());
            self
        }

        pub(crate) fn failing_downloads(mut self) -> Self {
            self.fail_downloads = true;
            self
        }
    }

    #[async_trait]
    impl PhotoSource for MockPhotoSource {
        fn name(&self) -> &str {
            "mock-photos"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn search(&self, query: &str, per_page: usize) -> PipelineResult<Vec<PhotoCandidate>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            if self.missing.iter().any(|w| query.contains(w.as_str())) {
                return Ok(Vec::new());
            }
            let slug: String = query
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect();
            Ok((0..per_page)
                .map(|i| PhotoCandidate {
                    url: format!("https://photos.test/{slug}-{i}.png?w=800"),
                    alt: None,
                })
                .collect())
        }

        async fn download(&self, url: &str, dest: &Path) -> PipelineResult<()> {
            if self.fail_downloads {
                return Err(PipelineError::Download {
                    url: url.to_string(),
                    message: "not a valid image".to_string(),
                });
            }
            tokio::fs::write(dest, TINY_PNG)
                .await
                .map_err(|e| PipelineError::Download {
                    url: url.to_string(),
                    message: e.to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockPhotoSource;
    use super::*;
    use std::sync::atomic::Ordering;

    const OUTLINE: &str = "Title: Rivers\n---\nSlide 1: Flow\n- water\nImage Suggestion: a river delta\n---\n\
        Slide 2: Dams\n- concrete\nImage Suggestion: a missing dam\n---\n\
        Slide 3: Fish\nImage Suggestion:   salmon jumping  \n---";

    fn fetcher(source: MockPhotoSource, dir: &Path) -> ImageFetcher {
        ImageFetcher::new(Box::new(source), dir.to_path_buf(), FetchOptions::default())
    }

    #[test]
    fn test_suggestions_in_order() {
        assert_eq!(
            suggestions(OUTLINE),
            vec!["a river delta", "a missing dam", "salmon jumping"]
        );
        assert!(suggestions("no pictures here").is_empty());
    }

    #[tokio::test]
    async fn test_empty_suggestion_does_not_swallow_separator() {
        let outline = "Title: T\n---\nSlide 1: A\n- a\nImage Suggestion:\n---\n\
            Slide 2: B\n- b\nImage Suggestion: a cat\n---\n";
        assert_eq!(suggestions(outline), vec!["a cat"]);

        let dir = tempfile::tempdir().unwrap();
        let source = MockPhotoSource::new();
        let queries = source.queries.clone();
        let assets = fetcher(source, dir.path()).fetch_for_outline(outline).await;

        assert_eq!(*queries.lock().unwrap(), vec!["a cat".to_string()]);
        assert_eq!(assets.len(), 1);
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://images.pexels.com/photos/1/pexels-photo-1.jpeg?auto=compress&w=800"),
            Some("pexels-photo-1.jpeg".to_string())
        );
        assert_eq!(file_name_from_url("https://x.test/a/b.png#frag"), Some("b.png".to_string()));
        assert_eq!(file_name_from_url("https://x.test/dir/"), None);
    }

    #[tokio::test]
    async fn test_one_fetch_per_suggestion_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let source = MockPhotoSource::new().missing("missing");
        let searches = source.searches.clone();
        let fetcher = fetcher(source, dir.path());

        let assets = fetcher.fetch_for_outline(OUTLINE).await;

        assert_eq!(searches.load(Ordering::SeqCst), 3);
        assert_eq!(assets.len(), 3);
        assert!(assets[0].is_some());
        assert!(assets[1].is_none());
        let third = assets[2].as_ref().unwrap();
        assert_eq!(third.suggestion, "salmon jumping");
        assert_eq!(third.local_path, dir.path().join("salmon-jumping-0.png"));
        assert!(third.local_path.exists());
    }

    #[tokio::test]
    async fn test_get_images_respects_n() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(MockPhotoSource::new(), dir.path());
        let paths = fetcher.get_images("cats", 2).await;
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.starts_with(dir.path())));
    }

    #[tokio::test]
    async fn test_failed_downloads_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(MockPhotoSource::new().failing_downloads(), dir.path());
        assert!(fetcher.get_images("cats", 1).await.is_empty());
        let assets = fetcher.fetch_for_outline(OUTLINE).await;
        assert!(assets.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_empty_images() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(MockPhotoSource::new(), dir.path());
        fetcher.get_images("cats", 2).await;

        assert_eq!(fetcher.empty_images().unwrap(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let gone = fetcher.in_dir(dir.path().join("never-created"));
        assert_eq!(gone.empty_images().unwrap(), 0);
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.photos.per_suggestion = 3;
        config.limits.photo_timeout_ms = 500;
        let options = FetchOptions::from_config(&config);
        assert_eq!(options.per_suggestion, 3);
        assert_eq!(options.timeout, Duration::from_millis(500));
    }
}
