//! The `deckforge config` command.

use clap::{Args, Subcommand};
use deckforge_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file location
    Path,

    /// Write a default config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// List registered templates and whether their files exist
    Templates,
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => println!("{}", Config::load()?.to_toml()?),
        ConfigCommand::Path => println!("{}", Config::default_path().display()),
        ConfigCommand::Init { force } => init(force)?,
        ConfigCommand::Templates => {
            for line in template_lines(&Config::load()?) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn init(force: bool) -> anyhow::Result<()> {
    let path = Config::default_path();
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Config::default().to_toml()?)?;

    tracing::info!("Config file created at: {}", path.display());
    println!("Configuration initialized at: {}", path.display());
    Ok(())
}

fn template_lines(config: &Config) -> Vec<String> {
    config
        .templates
        .entries
        .iter()
        .map(|entry| {
            let path = config.template_dir().join(&entry.file);
            let status = if path.is_file() { "ok" } else { "missing" };
            format!(
                "{:>3}  {:<14} {} ({status})",
                entry.id,
                entry.display_name(),
                path.display()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_lines_report_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dark.pptx"), b"stub").unwrap();

        let mut config = Config::default();
        config.templates.dir = dir.path().to_path_buf();
        let lines = template_lines(&config);

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Minimalistic"));
        assert!(lines[0].ends_with("(missing)"));
        assert!(lines[3].contains("Dark"));
        assert!(lines[3].ends_with("(ok)"));
    }
}
