use crate::config::Config;
use crate::domain::ChainEvent;
use crate::error::{ScanError, StartupError};
use crate::ledger::EventSource;
use crate::notifier::AlertDispatcher;
use crate::rules::AlertRules;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_BACKOFF_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    /// Pause after a successful pass, roughly one block time.
    pub poll_interval: Duration,
    /// Pause after a failed pass.
    pub backoff_interval: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff_interval: DEFAULT_BACKOFF_INTERVAL,
        }
    }
}

impl WatcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            backoff_interval: config.backoff_interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Scanning,
    Backoff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The chain has not moved past the watermark.
    Idle { head: u64 },
    Scanned {
        from_block: u64,
        to_block: u64,
        events: usize,
        alerts: usize,
    },
}

pub struct Watcher<S: EventSource> {
    source: S,
    rules: AlertRules,
    dispatcher: AlertDispatcher,
    settings: WatcherSettings,
    watermark: u64,
    state: WatcherState,
}

impl<S: EventSource> Watcher<S> {
    /// Connects to the ledger and starts watching from its current head.
    /// Blocks produced before startup are never scanned.
    pub async fn initialize(
        source: S,
        rules: AlertRules,
        dispatcher: AlertDispatcher,
        settings: WatcherSettings,
    ) -> Result<Self, StartupError> {
        let watermark = source
            .latest_block()
            .await
            .map_err(StartupError::Unreachable)?;
        info!("Watching for governance events after block {}", watermark);

        Ok(Self {
            source,
            rules,
            dispatcher,
            settings,
            watermark,
            state: WatcherState::Scanning,
        })
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// One scan pass over `(watermark, head]`. The watermark moves to `head`
    /// only if both event categories were fetched; on error it stays put and
    /// the same range is scanned again next time.
    pub async fn scan_once(&mut self) -> Result<ScanOutcome, ScanError> {
        let head = self.source.latest_block().await?;
        if head <= self.watermark {
            debug!("No new blocks (head {}, watermark {})", head, self.watermark);
            return Ok(ScanOutcome::Idle { head });
        }

        let from_block = self.watermark + 1;
        info!("Scanning blocks {} to {}...", from_block, head);

        let proposals = self.source.proposals_created(from_block, head).await?;
        let withdrawals = self.source.withdrawals(from_block, head).await?;

        let events: Vec<ChainEvent> = proposals
            .into_iter()
            .map(ChainEvent::from)
            .chain(withdrawals.into_iter().map(ChainEvent::from))
            .collect();

        let mut alerts = 0;
        for event in &events {
            let verdict = self.rules.classify(event);
            if verdict.triggered {
                let report = self.dispatcher.dispatch(&verdict.message).await;
                if !report.failed.is_empty() {
                    debug!(
                        "Alert for block {} reached {} of {} sinks",
                        event.origin().block_number,
                        report.delivered,
                        report.delivered + report.failed.len()
                    );
                }
                alerts += 1;
            } else {
                info!("{}", verdict.message);
            }
        }

        self.watermark = head;
        info!(
            "Scanned blocks {} to {}: {} events, {} alerts",
            from_block,
            head,
            events.len(),
            alerts
        );

        Ok(ScanOutcome::Scanned {
            from_block,
            to_block: head,
            events: events.len(),
            alerts,
        })
    }

    /// Runs one pass and returns how long to wait before the next.
    pub async fn tick(&mut self) -> Duration {
        match self.scan_once().await {
            Ok(_) => {
                self.state = WatcherState::Scanning;
                self.settings.poll_interval
            }
            Err(e) => {
                self.state = WatcherState::Backoff;
                error!(
                    "Monitoring error: {}; blocks after {} will be rescanned in {:?}",
                    e, self.watermark, self.settings.backoff_interval
                );
                self.settings.backoff_interval
            }
        }
    }

    /// Never returns. Errors are logged and retried after the backoff
    /// interval; only stopping the process ends the loop.
    pub async fn run_forever(&mut self) {
        info!(
            "Polling every {:?} (backoff {:?})",
            self.settings.poll_interval, self.settings.backoff_interval
        );
        loop {
            let pause = self.tick().await;
            sleep(pause).await;
        }
    }
}
