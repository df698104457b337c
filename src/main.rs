//! Melissa - voice assistant CLI
//!
#![doc = "Melissa - voice assistant CLI"]
#![doc = "Main entry point for the Melissa assistant."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use melissa::cli::{Cli, Commands};
use melissa::commands;
use melissa::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { no_voice, .. } => {
            if no_voice {
                tracing::debug!("Voice output disabled");
            }
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Ask { prompt, .. } => {
            tracing::debug!("Using prompt: {}", prompt);
            commands::ask::run_ask(config, prompt).await?;
            Ok(())
        }
        Commands::Notes { query } => {
            commands::notes::run_notes(&config, &query)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins; otherwise `--verbose` selects debug output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "melissa=debug" } else { "melissa=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
