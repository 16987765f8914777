pub mod config;
pub mod error;
pub mod exchange;
pub mod notify;
pub mod payload;
pub mod status;
pub mod trade;
pub mod types;

pub use config::{Config, DispatchConfig, MonitorConfig, NotificationConfig, TelegramConfig};
pub use error::{Error, Result};
pub use exchange::CandleSource;
pub use notify::NotificationChannel;
pub use payload::{EntryZone, SignalPayload, TakeProfits};
pub use status::{MonitorSnapshot, StatusBoard};
pub use trade::{TradeConfig, TradingPreset};
pub use types::*;
