//! preterm - term / preterm pregnancy outcome classifier
//!
//! Trains the classification pipeline on a CSV table and classifies records.

use clap::Parser;
use preterm_classifier::cli::{cmd_classify, cmd_config, cmd_train, show_help, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "preterm_classifier=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train { data, config }) => {
            cmd_train(&data, config.as_deref())?;
        }
        Some(Commands::Classify { data, config, record, json }) => {
            cmd_classify(&data, config.as_deref(), record.as_deref(), json)?;
        }
        Some(Commands::Config) => {
            cmd_config()?;
        }
        None => {
            show_help();
        }
    }

    Ok(())
}
