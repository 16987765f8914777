pub mod commands;
pub mod discord;
pub mod dispatcher;
pub mod telegram;
pub mod webhook;

pub use commands::{start_bot, BotDeps, Command, WatchedMarket};
pub use discord::DiscordChannel;
pub use dispatcher::{DispatchReport, SignalDispatcher};
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

use std::sync::Arc;

use tracing::info;

use common::{NotificationChannel, NotificationConfig};

/// Build every channel the configuration enables, in a stable order.
pub fn build_channels(
    config: &NotificationConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn NotificationChannel>> {
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

    if let Some(telegram) = &config.telegram {
        channels.push(Arc::new(TelegramChannel::from_config(telegram)));
    }
    if let Some(url) = &config.discord_webhook {
        channels.push(Arc::new(DiscordChannel::new(client.clone(), url.clone())));
    }
    if let Some(url) = &config.webhook_url {
        channels.push(Arc::new(WebhookChannel::new("webhook", client.clone(), url.clone())));
    }
    if let Some(url) = &config.n8n_webhook {
        channels.push(Arc::new(WebhookChannel::new("n8n", client.clone(), url.clone())));
    }

    for channel in &channels {
        info!(channel = %channel.name(), "Notification channel enabled");
    }
    channels
}
