//! Scoreline - Main Entry Point

use clap::Parser;
use scoreline::cli::{cmd_predict, cmd_train, Cli, Commands, TrainArgs};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoreline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            target,
            params,
            no_search,
            artifacts,
            min_score,
            cv_folds,
            seed,
        } => {
            cmd_train(&TrainArgs {
                data,
                target,
                params,
                no_search,
                artifacts,
                min_score,
                cv_folds,
                seed,
            })?;
        }
        Commands::Predict { data, artifacts, output } => {
            cmd_predict(&data, &artifacts, output.as_deref())?;
        }
    }

    Ok(())
}
