use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, StatusBoard};
use engine::{http_client, Engine, SourceRegistry};
use notify::{build_channels, start_bot, BotDeps, SignalDispatcher, WatchedMarket};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid configuration")?;
    for m in &cfg.monitors {
        info!(
            symbol = %m.symbol,
            exchange = %m.exchange,
            timeframe = %m.timeframe,
            interval_secs = m.check_interval.as_secs(),
            preset = ?m.preset,
            min_conditions = m.trade.min_conditions,
            min_confidence = m.trade.min_confidence,
            cooldown_secs = m.trade.signal_cooldown_secs,
            "Monitor configured"
        );
    }

    // ── Shared state ──────────────────────────────────────────────────────────
    let http = http_client()?;
    let board = StatusBoard::new();

    // ── Notification channels ─────────────────────────────────────────────────
    let channels = build_channels(&cfg.notifications, &http);
    if channels.is_empty() {
        warn!("No notification channels configured; signals will only be logged");
    }
    let dispatcher = Arc::new(SignalDispatcher::new(channels, cfg.dispatch));

    // ── Engine ────────────────────────────────────────────────────────────────
    let sources = SourceRegistry::with_defaults(http.clone());
    let engine = Engine::build(&cfg, &sources, dispatcher, board.clone())
        .context("failed to set up monitors")?;
    let markets: Vec<WatchedMarket> = engine
        .markets()
        .iter()
        .map(|(config, source)| WatchedMarket {
            config: config.clone(),
            source: Arc::clone(source),
        })
        .collect();

    let handle = engine.start();
    let mut side_tasks = Vec::new();

    // ── Telegram command bot ──────────────────────────────────────────────────
    match &cfg.notifications.telegram {
        Some(tg) if cfg.notifications.telegram_commands_enabled => {
            let deps = BotDeps {
                board: board.clone(),
                markets: Arc::new(markets),
                chat_id: tg.chat_id,
            };
            let bot = teloxide::Bot::new(tg.token.clone());
            side_tasks.push(tokio::spawn(start_bot(bot, deps, handle.shutdown_signal())));
        }
        Some(_) => info!("Telegram command bot disabled"),
        None => {}
    }

    // ── Status API ────────────────────────────────────────────────────────────
    if let Some(port) = cfg.status_port {
        let state = api::AppState::new(board.clone());
        let shutdown = handle.shutdown_signal();
        side_tasks.push(tokio::spawn(async move {
            if let Err(e) = api::serve(state, port, shutdown).await {
                error!(port, error = %e, "Status API failed");
            }
        }));
    }

    info!("All subsystems started. Waiting for shutdown signal.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("Shutdown signal received.");

    handle.shutdown().await;
    for task in side_tasks {
        if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
            warn!("Background task did not stop in time");
        }
    }
    info!("Exiting.");
    Ok(())
}
