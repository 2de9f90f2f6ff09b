use super::AlertSink;
use crate::utils::mask_url;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::info;

/// Slack-style incoming webhook: `POST {"text": message}`.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { url, client }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        let payload = serde_json::json!({ "text": message });
        let response = self.client.post(&self.url).json(&payload).send().await?;

        if response.status().is_success() {
            info!("Alert sent to webhook {}", mask_url(&self.url));
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(anyhow!("webhook returned {}: {}", status, error_text))
        }
    }
}
