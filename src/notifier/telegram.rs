use super::AlertSink;
use crate::config::Config;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tracing::info;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramSink {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramSink {
    pub fn new(client: reqwest::Client, bot_token: String, chat_id: &str) -> Self {
        Self {
            bot_token,
            chat_id: sanitize_chat_id(chat_id),
            api_base: TELEGRAM_API_BASE.to_string(),
            client,
        }
    }

    /// Points the sink at a self-hosted Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn maybe_from_config(client: reqwest::Client, config: &Config) -> Option<Self> {
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(Self::new(client, token.clone(), chat_id))
            }
            _ => None,
        }
    }
}

/// Operators often paste a `https://t.me/<chat>` link instead of the bare
/// chat id; keep only the last path segment in that case.
pub fn sanitize_chat_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("t.me/") {
        trimmed
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(trimmed)
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
        });

        let response = self.client.post(&url).json(&payload).send().await?;

        if response.status().is_success() {
            info!("Alert sent to Telegram chat {}", self.chat_id);
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(anyhow!("Telegram returned {}: {}", status, error_text))
        }
    }
}
