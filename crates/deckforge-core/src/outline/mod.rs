//! Outline extraction: topic → summary → optional code → slide outline text.
//!
//! Every stage degrades to placeholder content instead of failing, so the
//! caller always gets a usable [`TopicRecord`].

pub mod parse;
pub mod prompts;

use crate::config::Config;
use crate::llm::{LlmRequest, TextGenerator};
use crate::types::TopicRecord;
use std::time::Duration;

/// Prefix of the diagnostic topic written when the summary stage fails.
pub const TOPIC_FALLBACK_PREFIX: &str = "Error parsing topic: ";

/// Code placeholder when the reply holds no fenced block.
pub const CODE_NOT_FOUND: &str = "# Error: Could not extract code. Check prompt and response.";

/// Knobs for the extractor, usually taken from `[outline]`.
#[derive(Debug, Clone)]
pub struct OutlineOptions {
    pub summary_sentences: usize,
    pub code_language: String,
    /// Pause between topics after the summary/code stage
    pub topic_delay: Duration,
    /// Pause between topics after the structuring stage
    pub structure_delay: Duration,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            summary_sentences: 10,
            code_language: "python".to_string(),
            topic_delay: Duration::from_secs(55),
            structure_delay: Duration::from_secs(20),
        }
    }
}

impl OutlineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            summary_sentences: config.outline.summary_sentences,
            code_language: config.outline.code_language.clone(),
            topic_delay: Duration::from_secs(config.outline.topic_delay_secs),
            structure_delay: Duration::from_secs(config.outline.structure_delay_secs),
        }
    }
}

/// Drives the text generator through the outline stages.
pub struct OutlineExtractor {
    generator: TextGenerator,
    options: OutlineOptions,
}

impl OutlineExtractor {
    pub fn new(generator: TextGenerator, options: OutlineOptions) -> Self {
        Self { generator, options }
    }

    /// Name of the text provider behind the generator.
    pub fn provider_name(&self) -> &str {
        self.generator.provider_name()
    }

    /// Run the summary (and optional code) stage for every topic.
    ///
    /// Records come back in input order with `slides` left empty. When more
    /// than one topic is given, the configured delay separates consecutive
    /// topics.
    pub async fn process(&self, topics: &[String], include_code: bool) -> Vec<TopicRecord> {
        let mut records = Vec::with_capacity(topics.len());
        for (i, topic) in topics.iter().enumerate() {
            records.push(self.summarise_topic(topic, include_code).await);
            if topics.len() > 1 && i + 1 < topics.len() {
                pause(self.options.topic_delay).await;
            }
        }
        records
    }

    /// Run all stages for every topic, filling in `slides`.
    pub async fn structured(&self, topics: &[String], include_code: bool) -> Vec<TopicRecord> {
        let mut records = self.process(topics, include_code).await;
        let count = records.len();
        for (i, record) in records.iter_mut().enumerate() {
            record.slides = self.structure(record).await;
            if count > 1 && i + 1 < count {
                pause(self.options.structure_delay).await;
            }
        }
        records
    }

    /// Wait between two topics that each run every stage.
    ///
    /// Covers both configured delays so a per-topic loop keeps the same pace
    /// as [`structured`](Self::structured).
    pub async fn pause_between_topics(&self) {
        pause(self.options.topic_delay + self.options.structure_delay).await;
    }

    /// Summary plus optional code for a single topic.
    pub async fn summarise_topic(&self, topic: &str, include_code: bool) -> TopicRecord {
        let (title, summary) = self.summary_stage(topic).await;
        let code = if include_code {
            Some(self.code_stage(topic).await)
        } else {
            None
        };

        TopicRecord {
            topic: title,
            summary,
            code,
            slides: String::new(),
        }
    }

    /// Turn a summarised record into slide outline text.
    ///
    /// An upstream failure yields an empty string.
    pub async fn structure(&self, record: &TopicRecord) -> String {
        let code = record
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| (self.options.code_language.as_str(), c));
        let instructions = prompts::structure_prompt(&record.topic, &record.summary, code);
        let request = LlmRequest::for_topic(&instructions, &record.topic);

        match self.generator.complete(&request).await {
            Ok(response) => response.text,
            Err(e) => {
                tracing::error!("Slide structuring failed for '{}': {e}", record.topic);
                String::new()
            }
        }
    }

    async fn summary_stage(&self, topic: &str) -> (String, Vec<String>) {
        let instructions = prompts::summary_prompt(topic, self.options.summary_sentences);
        let request = LlmRequest::for_topic(&instructions, topic);

        let reason = match self.generator.complete(&request).await {
            Ok(response) => match parse::parse_summary(&response.text) {
                Ok(parsed) => {
                    tracing::debug!(
                        "Parsed '{}' with {} summary sentences",
                        parsed.topic,
                        parsed.summary.len()
                    );
                    return (parsed.topic, parsed.summary);
                }
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        tracing::warn!("Error parsing topic/summary for '{topic}': {reason}");
        (
            format!("{TOPIC_FALLBACK_PREFIX}{topic}"),
            vec![format!("Error parsing summary: {reason}")],
        )
    }

    async fn code_stage(&self, topic: &str) -> String {
        let language = &self.options.code_language;
        let instructions = prompts::code_prompt(topic, language);
        let request = LlmRequest::for_topic(&instructions, topic);

        let response = match self.generator.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Error extracting code for '{topic}': {e}");
                return format!("# Error extracting code: {e}");
            }
        };

        match parse::extract_code(&response.text, language) {
            Ok(Some(code)) => code,
            Ok(None) => {
                tracing::warn!("No fenced code block in reply for '{topic}'");
                CODE_NOT_FOUND.to_string()
            }
            Err(e) => {
                tracing::warn!("Error extracting code for '{topic}': {e}");
                format!("# Error extracting code: {e}")
            }
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tracing::info!("Waiting {}s before the next topic", delay.as_secs());
        tokio::time::sleep(delay).await;
    }
}
