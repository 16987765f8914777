use async_trait::async_trait;
use teloxide::prelude::*;

use common::{Error, NotificationChannel, Result, SignalPayload, TelegramConfig};

/// Posts the plain-text alert to one Telegram chat.
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramChannel {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        Self::new(Bot::new(config.token.clone()), config.chat_id)
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, payload: &SignalPayload) -> Result<()> {
        self.bot
            .send_message(self.chat_id, payload.to_message())
            .await
            .map_err(|e| Error::notification("telegram", e))?;
        Ok(())
    }
}
