use anyhow::Result;
use clap::Parser;
use governance_sentinel::config::Config;
use governance_sentinel::error::StartupError;
use governance_sentinel::ledger::GovernanceLedger;
use governance_sentinel::notifier::AlertDispatcher;
use governance_sentinel::rpc::RpcClient;
use governance_sentinel::rules::{AlertRules, format_ether};
use governance_sentinel::watcher::{Watcher, WatcherSettings};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "watcher")]
#[command(about = "Watch governance contracts and alert on risky proposals and withdrawals", long_about = None)]
struct Cli {
    /// Seconds between scans, overrides POLL_INTERVAL_SECS
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: Option<u64>,

    /// Seconds to wait after a failed scan, overrides BACKOFF_INTERVAL_SECS
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    backoff_interval: Option<u64>,

    /// Only write alerts to stderr, skip webhook and Telegram sinks
    #[arg(long, default_value = "false")]
    stderr_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Starting governance event watcher");

    let mut config = Config::from_env().map_err(|e| StartupError::Config(format!("{e:#}")))?;
    if let Some(secs) = cli.poll_interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.backoff_interval {
        config.backoff_interval = Duration::from_secs(secs);
    }
    info!("Configuration loaded for network {}", config.network);
    info!(
        "RPC URLs: {} endpoint(s) configured",
        config.json_rpc_urls.len()
    );
    info!("Proposal manager: {}", config.proposal_manager_address);
    info!("Treasury manager: {}", config.treasury_manager_address);

    let client = RpcClient::from_config(&config)?;
    let ledger = GovernanceLedger::from_config(client, &config);

    let rules = AlertRules::from_config(&config);
    info!(
        "Alerting on withdrawals of at least {} ETH and on keywords: {}",
        format_ether(rules.withdrawal_threshold()),
        config.alert_keywords.join(", ")
    );

    let dispatcher = if cli.stderr_only {
        info!("External alert sinks disabled (--stderr-only)");
        AlertDispatcher::new(Vec::new())
    } else {
        AlertDispatcher::from_config(&config)?
    };
    info!("{} external alert sink(s) configured", dispatcher.sink_count());

    let settings = WatcherSettings::from_config(&config);
    let mut watcher = match Watcher::initialize(ledger, rules, dispatcher, settings).await {
        Ok(watcher) => watcher,
        Err(e) => {
            error!("Watcher failed to start: {}", e);
            return Err(e.into());
        }
    };

    watcher.run_forever().await;

    Ok(())
}
