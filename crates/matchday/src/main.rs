use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use matchday::cli::Cli;
use matchday::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON result, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    info!(
        service = %config.ml.base_url,
        attempts = config.ml.max_attempts,
        timeout_ms = config.ml.timeout.as_millis() as u64,
        "matchday starting"
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight calls");
            on_interrupt.cancel();
        }
    });

    let output = matchday::run(cli.command, &config, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
