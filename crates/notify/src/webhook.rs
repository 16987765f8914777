use async_trait::async_trait;
use url::Url;

use common::{Error, NotificationChannel, Result, SignalPayload};

/// POSTs the JSON payload to an HTTP endpoint. Any 2xx is success.
pub struct WebhookChannel {
    name: String,
    client: reqwest::Client,
    url: Url,
}

impl WebhookChannel {
    pub fn new(name: impl Into<String>, client: reqwest::Client, url: Url) -> Self {
        Self {
            name: name.into(),
            client,
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, payload: &SignalPayload) -> Result<()> {
        let resp = self
            .client
            .post(self.url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::notification(&self.name, e))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(Error::notification(&self.name, format!("HTTP {status}: {body}")))
        }
    }
}
