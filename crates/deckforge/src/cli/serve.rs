//! The `deckforge serve` command.

use crate::server::{self, state::AppState};
use clap::Args;
use deckforge_core::{Config, DeckGenerator};
use std::sync::Arc;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind (defaults to `[server].host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (defaults to `[server].port`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Text generation backend
    #[arg(long, value_enum)]
    pub llm: Option<super::LlmChoice>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    super::apply_llm_override(&mut config, args.llm);
    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    std::fs::create_dir_all(config.output_dir())?;
    let generator = DeckGenerator::new(config)?;
    tracing::info!(
        "Using {} for outlines, writing decks to {}",
        generator.extractor().provider_name(),
        generator.config().output_dir().display()
    );

    let state = Arc::new(AppState::new(generator));
    server::run(&format!("{host}:{port}"), state).await
}
