//! Deckforge CLI - turn a topic into a slide deck.
//!
//! Deckforge asks a language model for an outline, fetches a stock photo for
//! every image suggestion, and writes a `.pptx` file. It runs either as an
//! HTTP service or as one-shot commands.
//!
//! # Usage
//!
//! ```bash
//! # Serve the HTTP API on 127.0.0.1:5000
//! deckforge serve
//!
//! # Generate a deck directly
//! deckforge generate "Tide pools" --template 2 --code
//!
//! # Only the outline, as JSON
//! deckforge outline "Tide pools" "Coral reefs" --format jsonl
//!
//! # View configuration
//! deckforge config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;
mod server;

/// Deckforge - topic in, presentation out.
#[derive(Parser, Debug)]
#[command(name = "deckforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(cli::serve::ServeArgs),

    /// Generate presentations for one or more topics
    Generate(cli::generate::GenerateArgs),

    /// Produce outline records without writing a presentation
    Outline(cli::outline::OutlineArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go to stderr directly.
    let config = match deckforge_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `deckforge config path`."
            );
            deckforge_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Deckforge v{}", deckforge_core::VERSION);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Generate(args) => cli::generate::execute(args, config).await,
        Commands::Outline(args) => cli::outline::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
