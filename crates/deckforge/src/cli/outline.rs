//! The `deckforge outline` command: outline records without a deck.

use clap::{Args, ValueEnum};
use deckforge_core::output::OutputFormat as CoreOutputFormat;
use deckforge_core::{Config, DeckGenerator, RecordWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Arguments for the `outline` command.
#[derive(Args, Debug)]
pub struct OutlineArgs {
    /// Topics to outline, processed in order
    #[arg(required = true)]
    pub topics: Vec<String>,

    /// Ask for a code snippet per topic
    #[arg(long)]
    pub code: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Text generation backend
    #[arg(long, value_enum)]
    pub llm: Option<super::LlmChoice>,
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Execute the outline command.
pub async fn execute(args: OutlineArgs, mut config: Config) -> anyhow::Result<()> {
    super::apply_llm_override(&mut config, args.llm);
    let pretty = config.output.pretty;
    let generator = DeckGenerator::new(config)?;

    let records = generator.outline(&args.topics, args.code).await;

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = RecordWriter::new(sink, args.format.into(), pretty);
    writer.write_records(&records)?;

    if writer.fallbacks() > 0 {
        tracing::warn!(
            "{} of {} topics produced placeholder records",
            writer.fallbacks(),
            writer.written()
        );
    }
    if let Some(path) = &args.output {
        tracing::info!("Wrote {} records to {}", writer.written(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mapping() {
        assert_eq!(CoreOutputFormat::from(OutputFormat::Json), CoreOutputFormat::Json);
        assert_eq!(
            CoreOutputFormat::from(OutputFormat::Jsonl),
            CoreOutputFormat::JsonLines
        );
    }
}
