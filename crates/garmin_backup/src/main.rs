use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use garmin_backup::auth::{TerminalPrompt, init_api};
use garmin_backup::cli::Cli;
use garmin_backup::observability;
use garmin_connect_client::GarminClient;
use garmin_connect_client::config::Config;
use garmin_connect_client::fake::FakeGarminClient;
use garmin_connect_client::http_client::ReqwestGarminClient;
use secrecy::SecretString;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Configure logging from env var `GARMIN_BACKUP_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("GARMIN_BACKUP_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!("garmin-backup: log filter: {}", log_env);

    let metrics = observability::install_recorder();

    let cli = Cli::parse();
    let outcome = run(cli).await;
    if let Some(handle) = &metrics {
        observability::log_counters(handle);
    }
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("garmin-backup: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let plan = cli.plan(Local::now().date_naive())?;
    let config = Config::from_env().context("reading environment")?;

    let client: Box<dyn GarminClient> = if cli.fake {
        tracing::info!("garmin-backup: using bundled sample activities");
        Box::new(FakeGarminClient::from_fixture()?)
    } else {
        Box::new(ReqwestGarminClient::from_config(&config)?)
    };

    let username = cli.username.clone().or(config.username.clone());
    let password = cli
        .password
        .clone()
        .map(SecretString::from)
        .or(config.password.clone());
    init_api(
        client.as_ref(),
        &config.token_store,
        username,
        password,
        &TerminalPrompt,
    )
    .await?;

    let name = client.get_full_name().await?;
    tracing::info!("garmin-backup: backing up activities of {name}");

    let summary = garmin_backup::backup(client.as_ref(), &plan)
        .await
        .with_context(|| format!("backing up into {}", plan.destination.display()))?;
    tracing::info!(
        activities = summary.activities,
        files = summary.files,
        bytes = summary.bytes,
        "garmin-backup: done"
    );
    Ok(())
}
