use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stockwatch::app::AppContext;
use stockwatch::cli::{commands, Cli, Commands};
use stockwatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(workers) = cli.workers {
        config.fetch.max_workers = workers;
    }

    let ctx = AppContext::new(config)?;

    match cli.command.unwrap_or_default() {
        Commands::Check {
            force,
            dry_run,
            source,
        } => {
            commands::check(&ctx, force, dry_run, source).await?;
        }
        Commands::Health { max_age } => {
            let failed = commands::health(&ctx, Duration::from_secs(max_age))?;
            if !failed.is_empty() {
                anyhow::bail!("Health check failed: {}", failed.join(", "));
            }
        }
    }

    Ok(())
}
