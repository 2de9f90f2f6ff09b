mod telegram;
mod webhook;

pub use telegram::{TelegramSink, sanitize_chat_id};
pub use webhook::WebhookSink;

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// A notification channel. Implementations report failure through the
/// returned error; the dispatcher decides what to do with it.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, message: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: Vec<String>,
}

/// Fans one alert out to every sink. Sinks are attempted concurrently and
/// independently; a failed delivery is logged and dropped, never retried.
pub struct AlertDispatcher {
    sinks: Vec<Box<dyn AlertSink>>,
    delivery_timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self {
            sinks,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
        self.delivery_timeout = delivery_timeout;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_DELIVERY_TIMEOUT)
            .build()
            .context("Failed to create HTTP client for alert sinks")?;

        let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();

        if let Some(url) = &config.slack_webhook_url {
            sinks.push(Box::new(WebhookSink::new(client.clone(), url.clone())));
            info!("Slack webhook notifications enabled");
        } else {
            info!("Slack webhook notifications disabled (no SLACK_WEBHOOK_URL)");
        }

        match TelegramSink::maybe_from_config(client, config) {
            Some(telegram) => {
                sinks.push(Box::new(telegram));
                info!("Telegram notifications enabled");
            }
            None => info!("Telegram notifications disabled (no credentials)"),
        }

        Ok(Self::new(sinks))
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub async fn dispatch(&self, message: &str) -> DispatchReport {
        // always written, even with no sinks configured
        eprintln!("🚨 ALERT: {message}");
        warn!(sinks = self.sinks.len(), "Alert raised");

        let attempts = self.sinks.iter().map(|sink| async move {
            let outcome = match timeout(self.delivery_timeout, sink.deliver(message)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!(
                    "delivery timed out after {:?}",
                    self.delivery_timeout
                )),
            };
            (sink.name(), outcome)
        });

        let mut report = DispatchReport::default();
        for (name, outcome) in join_all(attempts).await {
            match outcome {
                Ok(()) => {
                    debug!("Alert delivered to {}", name);
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!("Failed to send {} alert, it will not be retried: {:#}", name, e);
                    report.failed.push(name.to_string());
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingSink {
        name: &'static str,
        received: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        fn name(&self) -> &str {
            self.name
        }

        async fn deliver(&self, message: &str) -> Result<()> {
            self.received.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AlertSink for FailingSink {
        fn name(&self) -> &str {
            "broken"
        }

        async fn deliver(&self, _message: &str) -> Result<()> {
            anyhow::bail!("connection refused")
        }
    }

    struct StalledSink;

    #[async_trait]
    impl AlertSink for StalledSink {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn deliver(&self, _message: &str) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_the_others() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = AlertDispatcher::new(vec![
            Box::new(FailingSink),
            Box::new(RecordingSink {
                name: "recorder",
                received: received.clone(),
            }),
        ]);

        let report = dispatcher.dispatch("large withdrawal").await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["broken".to_string()]);
        assert_eq!(*received.lock().unwrap(), vec!["large withdrawal".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sink_is_cut_off_by_the_delivery_timeout() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = AlertDispatcher::new(vec![
            Box::new(StalledSink),
            Box::new(RecordingSink {
                name: "recorder",
                received: received.clone(),
            }),
        ])
        .with_delivery_timeout(Duration::from_secs(1));

        let report = dispatcher.dispatch("proposal alert").await;

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec!["stalled".to_string()]);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_without_sinks_is_a_no_op() {
        let dispatcher = AlertDispatcher::new(Vec::new());
        assert_eq!(dispatcher.sink_count(), 0);
        assert_eq!(dispatcher.dispatch("nobody listens").await, DispatchReport::default());
    }
}
