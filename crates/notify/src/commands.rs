use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::{dispatching::UpdateHandler, prelude::*, utils::command::BotCommands};
use tokio::sync::watch;
use tracing::{info, warn};

use common::{format_price, CandleSource, MonitorConfig, MonitorSnapshot, StatusBoard};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A configured monitor together with the source it polls.
#[derive(Clone)]
pub struct WatchedMarket {
    pub config: MonitorConfig,
    pub source: Arc<dyn CandleSource>,
}

/// Dependencies injected into every handler via `dptree`.
#[derive(Clone)]
pub struct BotDeps {
    pub board: StatusBoard,
    pub markets: Arc<Vec<WatchedMarket>>,
    /// Only this chat is served.
    pub chat_id: i64,
}

/// Telegram bot commands exposed to the operator.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Signal monitor commands:")]
pub enum Command {
    #[command(description = "Show the latest cycle of every monitor")]
    Status,
    #[command(description = "Show the configured trade plans")]
    Setup,
    #[command(description = "Show the current price of every monitored symbol")]
    Price,
    #[command(description = "Show this help")]
    Help,
}

/// Run the command bot in long-polling mode until `shutdown` flips to `true`.
pub async fn start_bot(bot: Bot, deps: BotDeps, mut shutdown: watch::Receiver<bool>) {
    let deps = Arc::new(deps);

    info!(chat_id = deps.chat_id, "Telegram command bot starting (long-polling)");

    let mut dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        while !*shutdown.borrow_and_update() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
        if let Ok(stopped) = token.shutdown() {
            stopped.await;
        }
    });

    dispatcher.dispatch().await;
    info!("Telegram command bot stopped");
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Status].endpoint(handle_status))
        .branch(case![Command::Setup].endpoint(handle_setup))
        .branch(case![Command::Price].endpoint(handle_price))
        .branch(case![Command::Help].endpoint(handle_help));

    Update::filter_message()
        .filter_map(|msg: Message| Some(msg.chat.id))
        .filter_async(auth_filter)
        .branch(command_handler)
}

/// Silently drop messages from any chat but the configured one.
async fn auth_filter(chat_id: ChatId, deps: Arc<BotDeps>) -> bool {
    let allowed = chat_id.0 == deps.chat_id;
    if !allowed {
        warn!(chat_id = chat_id.0, "Unauthorized Telegram access attempt");
    }
    allowed
}

async fn handle_status(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let snapshots = deps.board.snapshots().await;
    bot.send_message(msg.chat.id, render_status(&snapshots, Utc::now()))
        .await?;
    Ok(())
}

async fn handle_setup(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let configs: Vec<&MonitorConfig> = deps.markets.iter().map(|m| &m.config).collect();
    bot.send_message(msg.chat.id, render_setup(&configs)).await?;
    Ok(())
}

async fn handle_price(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let mut lines = Vec::with_capacity(deps.markets.len());
    for market in deps.markets.iter() {
        let symbol = &market.config.symbol;
        let line = match market.source.get_ticker(symbol).await {
            Ok(t) => format!(
                "{symbol} ({}): {}  bid {} / ask {}  24h {:+.2}%",
                market.source.name(),
                format_price(t.last),
                format_price(t.bid),
                format_price(t.ask),
                t.change_24h
            ),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Ticker lookup for /price failed");
                format!("{symbol} ({}): unavailable", market.source.name())
            }
        };
        lines.push(line);
    }
    let text = if lines.is_empty() {
        "No monitors configured.".to_string()
    } else {
        lines.join("\n")
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

// ─── Rendering ────────────────────────────────────────────────────────────────

pub fn render_status(snapshots: &[MonitorSnapshot], now: DateTime<Utc>) -> String {
    if snapshots.is_empty() {
        return "No monitor has completed a cycle yet.".to_string();
    }

    snapshots
        .iter()
        .map(|s| {
            let mut text = format!(
                "{} on {} ({})\n  cycles: {}  signals: {}",
                s.symbol, s.exchange, s.timeframe, s.cycles, s.signals_sent
            );
            if let Some(price) = s.last_price {
                text.push_str(&format!("\n  price: {}", format_price(price)));
            }
            if let (Some(pattern), Some(score)) = (s.last_pattern, s.last_confidence) {
                text.push_str(&format!(
                    "\n  pattern: {pattern}  confidence: {score}%  conditions: {}",
                    s.last_conditions.len()
                ));
            }
            match s.last_signal_at {
                Some(at) => text.push_str(&format!(
                    "\n  last signal: {} ({} min ago)",
                    at.format("%Y-%m-%d %H:%M UTC"),
                    (now - at).num_minutes()
                )),
                None => text.push_str("\n  last signal: never"),
            }
            if let Some(err) = &s.last_error {
                text.push_str(&format!("\n  last error: {err}"));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_setup(configs: &[&MonitorConfig]) -> String {
    if configs.is_empty() {
        return "No monitors configured.".to_string();
    }

    configs
        .iter()
        .map(|m| {
            let t = &m.trade;
            let mut text = format!(
                "{} on {} ({}, every {}s)\n  entry: {} - {}\n  stop loss: {}\n  TP1: {}",
                m.symbol,
                m.exchange,
                m.timeframe,
                m.check_interval.as_secs(),
                format_price(t.entry_zone_min),
                format_price(t.entry_zone_max),
                format_price(t.stop_loss),
                format_price(t.tp1),
            );
            if let Some(tp2) = t.tp2 {
                text.push_str(&format!("  TP2: {}", format_price(tp2)));
            }
            if let Some(tp3) = t.tp3 {
                text.push_str(&format!("  TP3: {}", format_price(tp3)));
            }
            text.push_str(&format!(
                "\n  R:R {:.2}  min conditions {}  min confidence {}%  cooldown {}s",
                t.risk_reward_ratio(),
                t.min_conditions,
                t.min_confidence,
                t.signal_cooldown_secs
            ));
            if let Some(preset) = m.preset {
                text.push_str(&format!("\n  preset: {preset}"));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use common::{Pattern, TradeConfig};

    fn monitor() -> MonitorConfig {
        MonitorConfig {
            symbol: "BTCUSD-PERP".into(),
            exchange: "cryptocom".into(),
            timeframe: "1h".into(),
            check_interval: std::time::Duration::from_secs(60),
            preset: None,
            trade: TradeConfig::default(),
        }
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/status", "bot").unwrap(), Command::Status);
        assert_eq!(Command::parse("/setup", "bot").unwrap(), Command::Setup);
        assert_eq!(Command::parse("/price", "bot").unwrap(), Command::Price);
        assert!(Command::parse("/trade", "bot").is_err());
    }

    #[test]
    fn status_lists_every_monitor() {
        let now = Utc.with_ymd_and_hms(2024, 11, 5, 15, 0, 0).unwrap();
        let mut snap = MonitorSnapshot::new("BTCUSD-PERP", "cryptocom", "1h");
        snap.cycles = 12;
        snap.last_price = Some(94_350.0);
        snap.last_pattern = Some(Pattern::Hammer);
        snap.last_confidence = Some(65);
        snap.last_conditions = vec!["a".into(), "b".into()];
        snap.last_signal_at = Some(now - Duration::minutes(30));

        let text = render_status(&[snap, MonitorSnapshot::new("ETHUSDT", "binance", "4h")], now);
        assert!(text.contains("BTCUSD-PERP on cryptocom (1h)"));
        assert!(text.contains("price: $94,350.00"));
        assert!(text.contains("pattern: HAMMER  confidence: 65%  conditions: 2"));
        assert!(text.contains("(30 min ago)"));
        assert!(text.contains("ETHUSDT on binance (4h)"));
        assert!(text.contains("last signal: never"));
    }

    #[test]
    fn empty_status() {
        assert_eq!(render_status(&[], Utc::now()), "No monitor has completed a cycle yet.");
    }

    #[test]
    fn setup_shows_trade_plan() {
        let m = monitor();
        let text = render_setup(&[&m]);
        assert!(text.contains("entry: $94,200.00 - $94,500.00"));
        assert!(text.contains("TP3: $98,500.00"));
        assert!(text.contains("R:R 1.07"));
        assert!(text.contains("cooldown 3600s"));
    }
}
