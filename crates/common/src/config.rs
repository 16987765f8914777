use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::{Error, Result, TradeConfig, TradingPreset};

/// All configuration, loaded from environment variables at startup.
/// Any invalid value is an `Error::Config` and the process must not start.
#[derive(Debug, Clone)]
pub struct Config {
    pub monitors: Vec<MonitorConfig>,
    pub notifications: NotificationConfig,
    pub dispatch: DispatchConfig,
    /// How long in-flight alerts may keep sending after a shutdown request.
    pub shutdown_grace: Duration,
    /// Port for the status API; disabled when unset.
    pub status_port: Option<u16>,
}

/// One symbol on one venue, with the trade plan it watches for.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub symbol: String,
    /// Candle source name, e.g. "binance".
    pub exchange: String,
    pub timeframe: String,
    pub check_interval: Duration,
    pub preset: Option<TradingPreset>,
    pub trade: TradeConfig,
}

impl MonitorConfig {
    /// Status board key: `exchange:symbol`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.exchange, self.symbol)
    }

    fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Config("symbol must not be empty".into()));
        }
        if self.check_interval.is_zero() {
            return Err(Error::Config(format!(
                "check_interval for {} must be greater than zero",
                self.symbol
            )));
        }
        self.trade.validate().map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", self.symbol)),
            other => other,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub webhook_url: Option<Url>,
    pub n8n_webhook: Option<Url>,
    pub discord_webhook: Option<Url>,
    pub telegram: Option<TelegramConfig>,
    /// Serve operator commands through the Telegram bot.
    pub telegram_commands_enabled: bool,
}

impl NotificationConfig {
    pub fn is_empty(&self) -> bool {
        self.webhook_url.is_none()
            && self.n8n_webhook.is_none()
            && self.discord_webhook.is_none()
            && self.telegram.is_none()
    }
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: i64,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Bounds applied by the signal dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    /// Per-attempt timeout for one channel send.
    pub send_timeout: Duration,
    /// Upper bound on how long a cycle waits for all channels.
    pub max_dispatch: Duration,
    /// Pause before the single retry of a failed send.
    pub retry_backoff: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_secs(10),
            max_dispatch: Duration::from_secs(30),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let mut trade = TradeConfig {
            entry_zone_min: env.parse_or("ENTRY_ZONE_MIN", 94_200.0)?,
            entry_zone_max: env.parse_or("ENTRY_ZONE_MAX", 94_500.0)?,
            stop_loss: env.parse_or("STOP_LOSS", 93_000.0)?,
            tp1: env.parse_or("TP1", 95_800.0)?,
            tp2: env.optional_target("TP2", Some(97_000.0))?,
            tp3: env.optional_target("TP3", Some(98_500.0))?,
            min_conditions: env.parse_or("MIN_CONDITIONS", 4)?,
            min_confidence: env.parse_or("MIN_CONFIDENCE", 60)?,
            signal_cooldown_secs: env.parse_or("SIGNAL_COOLDOWN", 3_600)?,
        };

        let preset = env.optional_parse::<TradingPreset>("TRADING_PRESET")?;
        if let Some(preset) = preset {
            preset.apply(&mut trade);
        }

        let base = MonitorConfig {
            symbol: env.get("SYMBOL").unwrap_or_else(|| "BTCUSD-PERP".to_string()),
            exchange: env
                .get("EXCHANGE")
                .unwrap_or_else(|| "cryptocom".to_string())
                .to_lowercase(),
            timeframe: env.get("TIMEFRAME").unwrap_or_else(|| "1h".to_string()),
            check_interval: Duration::from_secs(env.parse_or("CHECK_INTERVAL", 60)?),
            preset,
            trade,
        };

        let monitors = match env.get("MONITORS_FILE") {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("failed to read monitors file '{path}': {e}"))
                })?;
                parse_monitors_file(&content, &base)?
            }
            None => vec![base],
        };

        for monitor in &monitors {
            monitor.validate()?;
        }

        let telegram = match (env.get("TELEGRAM_TOKEN"), env.get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                token,
                chat_id: chat_id.trim().parse::<i64>().map_err(|_| {
                    Error::Config(format!("TELEGRAM_CHAT_ID is not a numeric id: '{chat_id}'"))
                })?,
            }),
            (Some(_), None) => {
                return Err(Error::Config(
                    "TELEGRAM_TOKEN is set but TELEGRAM_CHAT_ID is missing".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "TELEGRAM_CHAT_ID is set but TELEGRAM_TOKEN is missing".into(),
                ))
            }
            (None, None) => None,
        };

        let notifications = NotificationConfig {
            webhook_url: env.optional_url("WEBHOOK_URL")?,
            n8n_webhook: env.optional_url("N8N_WEBHOOK")?,
            discord_webhook: env.optional_url("DISCORD_WEBHOOK")?,
            telegram,
            telegram_commands_enabled: env.flag_or("TELEGRAM_COMMANDS_ENABLED", true),
        };

        let defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            send_timeout: env.secs_or("SEND_TIMEOUT_SECS", defaults.send_timeout)?,
            max_dispatch: env.secs_or("MAX_DISPATCH_SECS", defaults.max_dispatch)?,
            retry_backoff: Duration::from_millis(
                env.parse_or("RETRY_BACKOFF_MS", defaults.retry_backoff.as_millis() as u64)?,
            ),
        };

        Ok(Config {
            monitors,
            notifications,
            dispatch,
            shutdown_grace: env.secs_or("SHUTDOWN_GRACE_SECS", Duration::from_secs(10))?,
            status_port: env.optional_parse("STATUS_PORT")?,
        })
    }
}

// ─── Monitors file ────────────────────────────────────────────────────────────

/// Multi-symbol monitors file (TOML).
///
/// Example `config/monitors.toml`:
/// ```toml
/// [[monitor]]
/// symbol = "BTCUSDT"
/// exchange = "binance"
/// timeframe = "4h"
/// preset = "aggressive"
///
/// [[monitor]]
/// symbol = "ETHUSDT"
/// exchange = "bybit"
/// entry_zone_min = 3100.0
/// entry_zone_max = 3150.0
/// stop_loss = 3020.0
/// tp1 = 3300.0
/// ```
#[derive(Debug, Deserialize)]
struct MonitorsFile {
    #[serde(rename = "monitor")]
    monitors: Vec<MonitorEntry>,
}

/// One `[[monitor]]` entry. Unset fields inherit from the environment.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MonitorEntry {
    symbol: String,
    exchange: Option<String>,
    timeframe: Option<String>,
    check_interval: Option<u64>,
    signal_cooldown: Option<u64>,
    preset: Option<TradingPreset>,
    entry_zone_min: Option<f64>,
    entry_zone_max: Option<f64>,
    stop_loss: Option<f64>,
    tp1: Option<f64>,
    tp2: Option<f64>,
    tp3: Option<f64>,
    min_conditions: Option<usize>,
    min_confidence: Option<u8>,
}

/// Parse a monitors file. The preset of an entry is applied before its
/// explicit overrides.
pub fn parse_monitors_file(content: &str, base: &MonitorConfig) -> Result<Vec<MonitorConfig>> {
    let file: MonitorsFile = toml::from_str(content)
        .map_err(|e| Error::Config(format!("failed to parse monitors file: {e}")))?;

    if file.monitors.is_empty() {
        return Err(Error::Config("monitors file declares no [[monitor]] entries".into()));
    }

    let monitors = file
        .monitors
        .into_iter()
        .map(|entry| {
            let mut trade = base.trade.clone();
            if let Some(preset) = entry.preset {
                preset.apply(&mut trade);
            }
            override_with(&mut trade.entry_zone_min, entry.entry_zone_min);
            override_with(&mut trade.entry_zone_max, entry.entry_zone_max);
            override_with(&mut trade.stop_loss, entry.stop_loss);
            override_with(&mut trade.tp1, entry.tp1);
            if entry.tp2.is_some() {
                trade.tp2 = entry.tp2;
            }
            if entry.tp3.is_some() {
                trade.tp3 = entry.tp3;
            }
            override_with(&mut trade.min_conditions, entry.min_conditions);
            override_with(&mut trade.min_confidence, entry.min_confidence);
            override_with(&mut trade.signal_cooldown_secs, entry.signal_cooldown);

            MonitorConfig {
                symbol: entry.symbol,
                exchange: entry
                    .exchange
                    .map(|e| e.to_lowercase())
                    .unwrap_or_else(|| base.exchange.clone()),
                timeframe: entry.timeframe.unwrap_or_else(|| base.timeframe.clone()),
                check_interval: entry
                    .check_interval
                    .map(Duration::from_secs)
                    .unwrap_or(base.check_interval),
                preset: entry.preset.or(base.preset),
                trade,
            }
        })
        .collect();

    Ok(monitors)
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

// ─── Env helpers ──────────────────────────────────────────────────────────────

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn optional_parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    Error::Config(format!("environment variable '{key}' is invalid ('{raw}'): {e}"))
                })
            })
            .transpose()
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.optional_parse(key)?.unwrap_or(default))
    }

    fn flag_or(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(raw) => matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
            None => default,
        }
    }

    fn secs_or(&self, key: &str, default: Duration) -> Result<Duration> {
        Ok(self
            .optional_parse::<u64>(key)?
            .map(Duration::from_secs)
            .unwrap_or(default))
    }

    /// A take-profit level that may be switched off with `none`.
    fn optional_target(&self, key: &str, default: Option<f64>) -> Result<Option<f64>> {
        match self.get(key) {
            Some(raw) if raw.eq_ignore_ascii_case("none") => Ok(None),
            Some(_) => self.optional_parse(key),
            None => Ok(default),
        }
    }

    fn optional_url(&self, key: &str) -> Result<Option<Url>> {
        self.get(key)
            .map(|raw| {
                Url::parse(&raw)
                    .map_err(|e| Error::Config(format!("'{key}' is not a valid URL: {e}")))
            })
            .transpose()
    }
}
