//! Pipeline orchestration for a single presentation.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::{ArtifactNaming, Config};
use crate::deck::DocumentAssembler;
use crate::error::{DeckError, Result};
use crate::llm::{GenerateOptions, LlmProvider, LlmProviderFactory, TextGenerator};
use crate::outline::{OutlineExtractor, OutlineOptions};
use crate::photos::{FetchOptions, ImageFetcher, PexelsSource, PhotoSource};
use crate::types::{GenerationOutcome, PresentationArtifact, TopicRecord};

/// What to generate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateRequest {
    pub topic: String,
    /// Key into the configured template map
    pub template: Option<u32>,
    /// Ask for a code snippet and add a code slide
    pub include_code: bool,
}

impl GenerateRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }
}

/// Runs the whole pipeline. Cheap to share behind an `Arc`.
pub struct DeckGenerator {
    config: Config,
    extractor: OutlineExtractor,
    fetcher: ImageFetcher,
}

impl DeckGenerator {
    /// Build providers from config.
    ///
    /// Fails when the selected text provider has no API key; a missing photo
    /// key only disables pictures.
    pub fn new(config: Config) -> Result<Self> {
        let provider = LlmProviderFactory::from_config(
            &config.llm,
            Duration::from_millis(config.limits.llm_timeout_ms),
        )?;
        let photos = PexelsSource::from_config(
            &config.photos,
            FetchOptions::from_config(&config).timeout,
        );
        Ok(Self::with_components(config, provider, Box::new(photos)))
    }

    /// Build with explicit service backends.
    pub fn with_components(
        config: Config,
        provider: Box<dyn LlmProvider>,
        photos: Box<dyn PhotoSource>,
    ) -> Self {
        let generator = TextGenerator::new(provider, GenerateOptions::from_config(&config));
        let extractor = OutlineExtractor::new(generator, OutlineOptions::from_config(&config));
        let fetcher = ImageFetcher::new(photos, config.image_dir(), FetchOptions::from_config(&config));

        tracing::debug!(
            "Deck generator ready (text: {}, photos: {})",
            extractor.provider_name(),
            fetcher.source_name()
        );

        Self {
            config,
            extractor,
            fetcher,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn extractor(&self) -> &OutlineExtractor {
        &self.extractor
    }

    /// Outline extraction only, for every topic in order.
    pub async fn outline(&self, topics: &[String], include_code: bool) -> Vec<TopicRecord> {
        self.extractor.structured(topics, include_code).await
    }

    /// Generate one presentation.
    ///
    /// Upstream and picture problems degrade the deck instead of failing;
    /// only writing the file can fail.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerationOutcome> {
        let start = Instant::now();
        let output_dir = self.config.output_dir();
        let artifact = PresentationArtifact::in_dir(&output_dir, &self.next_id());
        tracing::info!("Generating '{}' as {}", request.topic, artifact.filename);

        let mut record = self
            .extractor
            .summarise_topic(&request.topic, request.include_code)
            .await;
        record.slides = self.extractor.structure(&record).await;
        if record.slides.trim().is_empty() {
            tracing::warn!("No slide outline for '{}'; the deck will be empty", request.topic);
        }

        // Unique per request: artifact ids repeat under fixed naming.
        let base_dir = self.fetcher.image_dir();
        tokio::fs::create_dir_all(base_dir).await?;
        let work_dir = tempfile::Builder::new()
            .prefix(&format!("{}-", artifact.id))
            .tempdir_in(base_dir)?;
        let fetcher = self.fetcher.in_dir(work_dir.path().to_path_buf());
        let images: Vec<Option<PathBuf>> = fetcher
            .fetch_for_outline(&record.slides)
            .await
            .into_iter()
            .map(|asset| asset.map(|a| a.local_path))
            .collect();
        let fetch_time = start.elapsed();

        let template = self.resolve_template(request.template);
        tokio::fs::create_dir_all(&output_dir).await?;

        let assembler =
            DocumentAssembler::new(template).with_cleanup_dir(fetcher.image_dir().to_path_buf());
        let slides = record.slides;
        let path = artifact.path.clone();
        let report = tokio::task::spawn_blocking(move || assembler.assemble(&slides, &images, &path))
            .await
            .map_err(|e| DeckError::Io(std::io::Error::other(format!("Task join error: {e}"))))??;
        // The assembler already removed the directory; this only covers its failures.
        drop(work_dir);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Saved {} ({} slides, {} pictures) in {elapsed_ms}ms (outline + pictures {:?})",
            artifact.path.display(),
            report.slide_count,
            report.pictures_placed,
            fetch_time
        );

        Ok(GenerationOutcome {
            artifact,
            report,
            elapsed_ms,
        })
    }

    /// Generate one presentation per request, in order.
    ///
    /// Consecutive topics are separated by the configured outline delays; no
    /// pause follows the last one. A failed request does not stop the rest.
    pub async fn generate_all(&self, requests: &[GenerateRequest]) -> Vec<Result<GenerationOutcome>> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            outcomes.push(self.generate(request).await);
            if i + 1 < requests.len() {
                self.extractor.pause_between_topics().await;
            }
        }
        outcomes
    }

    fn resolve_template(&self, id: Option<u32>) -> Option<PathBuf> {
        let id = id?;
        let path = self.config.template_path(id);
        if path.is_none() {
            tracing::warn!("Unknown template id {id}; using a blank presentation");
        }
        path
    }

    fn next_id(&self) -> String {
        match self.config.output.naming {
            ArtifactNaming::Random => {
                format!("presentation_{}", rand::thread_rng().gen_range(1000..=9999))
            }
            ArtifactNaming::Fixed => "presentation".to_string(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::staged_provider;
    use super::*;
    use crate::deck::package_entries;
    use crate::llm::client::testing::MockProvider;
    use crate::photos::fetcher::testing::MockPhotoSource;
    use std::path::Path;
    use std::sync::atomic::Ordering;

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.general.output_dir = root.join("presentations");
        config.general.image_dir = root.join("images");
        config.templates.dir = root.join("template");
        config.outline.topic_delay_secs = 0;
        config.outline.structure_delay_secs = 0;
        config
    }

    #[tokio::test]
    async fn test_generate_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let provider = staged_provider();
        let calls = provider.call_count_handle();
        let photos = MockPhotoSource::new();
        let searches = photos.searches.clone();

        let generator =
            DeckGenerator::with_components(test_config(dir.path()), Box::new(provider), Box::new(photos));
        let outcome = generator
            .generate(&GenerateRequest::new("tide pools"))
            .await
            .unwrap();

        // summary + structure, no code stage
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(searches.load(Ordering::SeqCst), 2);

        let artifact = &outcome.artifact;
        assert!(artifact.path.exists());
        assert!(artifact.id.starts_with("presentation_"));
        assert_eq!(artifact.id.len(), "presentation_1234".len());
        assert_eq!(outcome.report.slide_count, 3);
        assert_eq!(outcome.report.pictures_placed, 2);

        // working pictures are gone after assembly
        assert_eq!(std::fs::read_dir(dir.path().join("images")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_generate_with_code_adds_code_slide() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new(|_, prompt| {
            Ok(if prompt.starts_with("Write detailed") {
                testing::SUMMARY_REPLY.to_string()
            } else if prompt.starts_with("Give a short") {
                testing::CODE_REPLY.to_string()
            } else {
                format!("{}Slide 3: Code\n```python\nprint('tide')\n```\n---\n", testing::OUTLINE_REPLY)
            })
        });
        let prompts = provider.prompts_handle();

        let generator = DeckGenerator::with_components(
            test_config(dir.path()),
            Box::new(provider),
            Box::new(MockPhotoSource::new()),
        );
        let request = GenerateRequest {
            include_code: true,
            ..GenerateRequest::new("tide pools")
        };
        let outcome = generator.generate(&request).await.unwrap();

        assert_eq!(prompts.lock().unwrap().len(), 3);
        // title + 3 blocks + code slide
        assert_eq!(outcome.report.slide_count, 5);
    }

    #[tokio::test]
    async fn test_missing_pictures_do_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let generator = DeckGenerator::with_components(
            test_config(dir.path()),
            Box::new(staged_provider()),
            Box::new(MockPhotoSource::new().missing("anemone")),
        );
        let outcome = generator
            .generate(&GenerateRequest::new("tide pools"))
            .await
            .unwrap();

        assert_eq!(outcome.report.pictures_placed, 1);
        assert_eq!(outcome.report.pictures_skipped, 1);
        let entries = package_entries(&outcome.artifact.path);
        assert!(entries["ppt/slides/slide2.xml"].contains("<p:pic>"));
        assert!(!entries["ppt/slides/slide3.xml"].contains("<p:pic>"));
    }

    #[tokio::test]
    async fn test_failing_text_provider_still_writes_a_deck() {
        let dir = tempfile::tempdir().unwrap();
        let photos = MockPhotoSource::new();
        let searches = photos.searches.clone();
        let generator = DeckGenerator::with_components(
            test_config(dir.path()),
            Box::new(MockProvider::failing(Some(500), "boom")),
            Box::new(photos),
        );
        let outcome = generator
            .generate(&GenerateRequest::new("tide pools"))
            .await
            .unwrap();

        assert!(outcome.artifact.path.exists());
        assert_eq!(outcome.report.slide_count, 0);
        assert_eq!(searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_template_falls_back_to_blank() {
        let dir = tempfile::tempdir().unwrap();
        let generator = DeckGenerator::with_components(
            test_config(dir.path()),
            Box::new(staged_provider()),
            Box::new(MockPhotoSource::new()),
        );
        let request = GenerateRequest {
            template: Some(42),
            ..GenerateRequest::new("tide pools")
        };
        let outcome = generator.generate(&request).await.unwrap();
        assert_eq!(outcome.report.slide_count, 3);

        // id 1 is mapped but the file does not exist
        let request = GenerateRequest {
            template: Some(1),
            ..GenerateRequest::new("tide pools")
        };
        let outcome = generator.generate(&request).await.unwrap();
        assert_eq!(outcome.report.slide_count, 3);
    }

    #[tokio::test]
    async fn test_fixed_naming() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.output.naming = ArtifactNaming::Fixed;
        let generator = DeckGenerator::with_components(
            config,
            Box::new(staged_provider()),
            Box::new(MockPhotoSource::new()),
        );
        let outcome = generator
            .generate(&GenerateRequest::new("tide pools"))
            .await
            .unwrap();
        assert_eq!(outcome.artifact.filename, "presentation.pptx");
        assert_eq!(
            outcome.artifact.path,
            dir.path().join("presentations/presentation.pptx")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_all_waits_only_between_topics() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.outline.topic_delay_secs = 55;
        config.outline.structure_delay_secs = 20;
        let generator = DeckGenerator::with_components(
            config,
            Box::new(staged_provider()),
            Box::new(MockPhotoSource::new().missing("")),
        );

        let start = tokio::time::Instant::now();
        let outcomes = generator
            .generate_all(&[GenerateRequest::new("tide pools")])
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        let outcomes = generator
            .generate_all(&[GenerateRequest::new("tide pools"), GenerateRequest::new("reefs")])
            .await;
        assert!(outcomes.iter().all(|o| o.is_ok()));
        assert!(start.elapsed() >= Duration::from_secs(75));
        assert!(start.elapsed() < Duration::from_secs(76));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_fixed_name_requests_keep_their_pictures() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.output.naming = ArtifactNaming::Fixed;
        let generator = DeckGenerator::with_components(
            config,
            Box::new(staged_provider()),
            Box::new(MockPhotoSource::new()),
        );

        let request = GenerateRequest::new("tide pools");
        let (a, b) = tokio::join!(generator.generate(&request), generator.generate(&request));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.artifact.id, b.artifact.id);
        assert_eq!(a.report.pictures_placed, 2);
        assert_eq!(b.report.pictures_placed, 2);
        let leftovers = std::fs::read_dir(dir.path().join("images")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_outline_only() {
        let dir = tempfile::tempdir().unwrap();
        let generator = DeckGenerator::with_components(
            test_config(dir.path()),
            Box::new(staged_provider()),
            Box::new(MockPhotoSource::new()),
        );
        let records = generator
            .outline(&["tide pools".to_string(), "reefs".to_string()], false)
            .await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].topic, "Tide Pools");
        assert_eq!(records[1].slides, testing::OUTLINE_REPLY);
        assert!(!dir.path().join("presentations").exists());
    }

    #[test]
    fn test_new_requires_llm_key() {
        let mut config = Config::default();
        config.llm.provider = "gemini".to_string();
        config.llm.gemini = Some(crate::config::GeminiConfig {
            api_key: "${DECKFORGE_TEST_UNSET_KEY}".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            DeckGenerator::new(config),
            Err(DeckError::Pipeline(_))
        ));
    }
}
