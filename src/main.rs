use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use notice_relay::commands::CommandRouter;
use notice_relay::config::{Config, ConfigError};
use notice_relay::delivery::MessageFormatter;
use notice_relay::diff::DiffEngine;
use notice_relay::logging::init_tracing;
use notice_relay::scheduler::{Pipeline, Scheduler, StatusBoard};
use notice_relay::server::{AppState, build_router};
use notice_relay::source::{ImsSource, SourceError};
use notice_relay::subscriptions::{DirectoryError, SqliteSubscriptions};
use notice_relay::telegram::{TelegramClient, TelegramError, UpdatePoller};

/// Errors that abort start-up.
#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to open subscription database: {0}")]
    Directory(#[from] DirectoryError),

    #[error("failed to set up notice source: {0}")]
    Source(#[from] SourceError),

    #[error("failed to set up Telegram client: {0}")]
    Telegram(#[from] TelegramError),

    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", StartupError::from(e));
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.environment);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), StartupError> {
    info!(?config, "Starting notice relay");

    let directory = Arc::new(SqliteSubscriptions::open(&config.db_path)?);
    let source = ImsSource::new(&config.source_url, config.branch_field.clone())?;
    let telegram = TelegramClient::new(&config.bot_token)?;
    let status = StatusBoard::new();

    let pipeline = Pipeline::new(
        source,
        telegram.clone(),
        DiffEngine::new(config.schedule.lookback_limit),
        MessageFormatter::new(config.message_prefix.clone()),
        status.clone(),
    );
    let scheduler = Scheduler::new(pipeline, Arc::clone(&directory), config.schedule.clone());

    let router = CommandRouter::new(Arc::clone(&directory), config.branches.clone());
    let poller = UpdatePoller::new(telegram, router, config.bot_name.clone());

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", config.listen_addr);

    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));
    let poller_task = tokio::spawn(poller.run(shutdown.clone()));

    let served = axum::serve(listener, build_router(AppState::new(status)))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;

    // Stop the background tasks even if the server failed.
    shutdown.cancel();
    let (scheduler_result, poller_result) = tokio::join!(scheduler_task, poller_task);
    for (task, result) in [("scheduler", scheduler_result), ("update poller", poller_result)] {
        if let Err(e) = result {
            error!(task, error = %e, "Background task panicked");
        }
    }

    served?;
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_on_ctrl_c(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    info!("Ctrl-C received, shutting down");
    shutdown.cancel();
}
