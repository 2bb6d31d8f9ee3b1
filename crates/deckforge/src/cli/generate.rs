//! The `deckforge generate` command: one presentation per topic.

use clap::Args;
use deckforge_core::{Config, DeckGenerator, GenerateRequest};
use std::path::PathBuf;

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Topics to build decks for
    #[arg(required = true)]
    pub topics: Vec<String>,

    /// Template id from `[templates]` (blank deck when omitted)
    #[arg(short, long)]
    pub template: Option<u32>,

    /// Add a code example slide
    #[arg(long)]
    pub code: bool,

    /// Directory for the written files (defaults to `[general].output_dir`)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Text generation backend
    #[arg(long, value_enum)]
    pub llm: Option<super::LlmChoice>,
}

/// Execute the generate command.
///
/// Topics run in order with the configured outline delays between them. A
/// failed topic is reported and skipped; the command fails only when no
/// deck was written.
pub async fn execute(args: GenerateArgs, mut config: Config) -> anyhow::Result<()> {
    super::apply_llm_override(&mut config, args.llm);
    if let Some(dir) = args.output_dir {
        config.general.output_dir = dir;
    }
    let generator = DeckGenerator::new(config)?;

    let requests = build_requests(args.topics, args.template, args.code);
    let outcomes = generator.generate_all(&requests).await;

    let mut written = 0;
    for (request, outcome) in requests.iter().zip(outcomes) {
        let topic = &request.topic;
        match outcome {
            Ok(outcome) => {
                written += 1;
                let report = &outcome.report;
                tracing::info!(
                    "'{topic}': {} slides, {} pictures ({} skipped) in {}ms",
                    report.slide_count,
                    report.pictures_placed,
                    report.pictures_skipped,
                    outcome.elapsed_ms
                );
                println!("{}", outcome.artifact.path.display());
            }
            Err(e) => tracing::error!("Failed to generate '{topic}': {e}"),
        }
    }

    if written == 0 {
        anyhow::bail!("No presentation was generated");
    }
    Ok(())
}

fn build_requests(topics: Vec<String>, template: Option<u32>, include_code: bool) -> Vec<GenerateRequest> {
    topics
        .into_iter()
        .map(|topic| GenerateRequest {
            topic,
            template,
            include_code,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requests_keeps_topic_order() {
        let requests = build_requests(vec!["a".into(), "b".into()], Some(2), true);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].topic, "a");
        assert_eq!(requests[1].topic, "b");
        assert!(requests.iter().all(|r| r.template == Some(2) && r.include_code));
    }
}
