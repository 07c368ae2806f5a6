use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::Bot;
use tracing::{error, info};

use hw_watchbot::clock::SystemClock;
use hw_watchbot::config;
use hw_watchbot::db;
use hw_watchbot::notifier::TelegramSink;
use hw_watchbot::poller::Poller;
use hw_watchbot::practicum::PracticumClient;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    if !cfg.check_ready() {
        error!(missing = ?cfg.missing_secrets(), "required configuration is missing; refusing to start");
        std::process::exit(1);
    }

    let api = PracticumClient::from_config(&cfg)?;
    let sink = TelegramSink::new(Bot::new(cfg.telegram.bot_token.clone()), &cfg.telegram.chat_id);
    let mut poller = Poller::new(
        Arc::new(api),
        Arc::new(sink),
        Arc::new(SystemClock),
        cfg.poll_interval(),
    );
    if let Some(from_date) = cfg.app.initial_from_date {
        poller = poller.with_checkpoint(from_date);
    }

    if cfg.app.persist_state {
        cfg.ensure_dirs()?;
        let pool = db::init_pool(&cfg.database_url()).await?;
        db::run_migrations(&pool).await?;
        if let Some(state) = db::load_poll_state(&pool).await? {
            info!(checkpoint = state.checkpoint, "resuming from saved poll state");
            poller = poller.with_state(state);
        }
        poller = poller.with_store(pool);
    }

    tokio::select! {
        _ = poller.run() => {}
        _ = shutdown_signal() => info!("shutdown signal received; stopping"),
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                error!(?err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
