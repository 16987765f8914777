use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use url::Url;

use common::{format_price, Error, NotificationChannel, Result, SignalPayload};

/// Embed sidebar colour (green).
const EMBED_COLOR: u32 = 0x00FF00;

/// Posts an embed to a Discord webhook.
pub struct DiscordChannel {
    client: reqwest::Client,
    url: Url,
}

impl DiscordChannel {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

/// Webhook body: the text alert plus a compact embed.
pub fn discord_body(payload: &SignalPayload) -> Value {
    let field = |name: &str, value: String| json!({ "name": name, "value": value, "inline": true });
    json!({
        "content": payload.to_message(),
        "embeds": [{
            "title": format!("\u{1F6A8} {} {}", payload.signal_type, payload.symbol),
            "color": EMBED_COLOR,
            "fields": [
                field(
                    "Entry",
                    format!(
                        "{} - {}",
                        format_price(payload.entry_zone.min),
                        format_price(payload.entry_zone.max)
                    ),
                ),
                field("Stop Loss", format_price(payload.stop_loss)),
                field("TP1", format_price(payload.take_profits.tp1)),
                field("Confidence", format!("{}%", payload.confidence_score)),
                field("Pattern", payload.pattern.to_string()),
                field("R:R", format!("{:.2}", payload.risk_reward_ratio)),
            ],
        }],
    })
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, payload: &SignalPayload) -> Result<()> {
        let resp = self
            .client
            .post(self.url.clone())
            .json(&discord_body(payload))
            .send()
            .await
            .map_err(|e| Error::notification("discord", e))?;

        match resp.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::notification("discord", format!("HTTP {status}: {body}")))
            }
        }
    }
}
