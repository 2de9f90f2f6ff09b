use alloy_primitives::utils::parse_ether;
use alloy_primitives::{Address, U256, address};
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";
const DEFAULT_PROPOSAL_MANAGER: Address = address!("0xd8b934580fcE35a11B58C6D73aDeE468a2833fa8");
const DEFAULT_TREASURY_MANAGER: Address = address!("0x9D7f74d0C41E726EC95884E0e97Fa6129e3b5E99");
const DEFAULT_CITIZEN_REGISTRY: Address = address!("0x7EF2e0048f5bAeDe046f6BF797943daF4ED8CB47");

pub const DEFAULT_KEYWORDS: [&str; 6] = ["hack", "steal", "malicious", "exploit", "drain", "backdoor"];

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_urls: Vec<String>,
    pub network: String,
    pub proposal_manager_address: Address,
    pub treasury_manager_address: Address,
    pub citizen_registry_address: Address,
    pub slack_webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub withdrawal_threshold: U256,
    pub alert_keywords: Vec<String>,
    pub poll_interval: Duration,
    pub backoff_interval: Duration,
    pub rpc_timeout: Duration,
    pub rpc_max_retries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let json_rpc_urls = std::env::var("RPC_URLS")
            .or_else(|_| std::env::var("RPC_URL"))
            .map(|raw| parse_list(&raw))
            .unwrap_or_else(|_| vec![DEFAULT_RPC_URL.to_string()]);
        if json_rpc_urls.is_empty() {
            anyhow::bail!("RPC_URLS cannot be empty");
        }

        let network = std::env::var("NETWORK_NAME").unwrap_or_else(|_| "sepolia".to_string());

        let proposal_manager_address =
            address_var("PROPOSAL_MANAGER_ADDRESS", DEFAULT_PROPOSAL_MANAGER)?;
        let treasury_manager_address =
            address_var("TREASURY_MANAGER_ADDRESS", DEFAULT_TREASURY_MANAGER)?;
        let citizen_registry_address =
            address_var("CITIZEN_REGISTRY_ADDRESS", DEFAULT_CITIZEN_REGISTRY)?;

        let withdrawal_threshold = match std::env::var("LARGE_WITHDRAWAL_THRESHOLD_ETH") {
            Ok(raw) => parse_threshold(&raw)?,
            Err(_) => U256::from(10u64).pow(U256::from(18u64)),
        };

        let alert_keywords = match std::env::var("ALERT_KEYWORDS") {
            Ok(raw) => parse_keywords(&raw),
            Err(_) => DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        };
        if alert_keywords.is_empty() {
            anyhow::bail!("ALERT_KEYWORDS cannot be empty");
        }

        Ok(Config {
            json_rpc_urls,
            network,
            proposal_manager_address,
            treasury_manager_address,
            citizen_registry_address,
            slack_webhook_url: non_empty_var("SLACK_WEBHOOK_URL"),
            telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: non_empty_var("TELEGRAM_CHAT_ID"),
            withdrawal_threshold,
            alert_keywords,
            poll_interval: interval_var("POLL_INTERVAL_SECS", 15)?,
            backoff_interval: interval_var("BACKOFF_INTERVAL_SECS", 30)?,
            rpc_timeout: interval_var("RPC_TIMEOUT_SECS", 30)?,
            rpc_max_retries: u64_var("RPC_MAX_RETRIES", 3)? as usize,
        })
    }
}

fn address_var(name: &str, default: Address) -> Result<Address> {
    match std::env::var(name) {
        Ok(raw) => parse_address(name, &raw),
        Err(_) => Ok(default),
    }
}

pub fn parse_address(name: &str, raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).with_context(|| format!("Invalid {name} format"))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn u64_var(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a non-negative integer")),
        Err(_) => Ok(default),
    }
}

fn interval_var(name: &str, default_secs: u64) -> Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => parse_interval(name, &raw),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

/// Whole seconds, at least one.
pub fn parse_interval(name: &str, raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a positive integer"))?;
    if secs == 0 {
        anyhow::bail!("{name} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Keywords are matched case-insensitively, so they are stored lowercased.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    parse_list(raw).into_iter().map(|k| k.to_lowercase()).collect()
}

pub fn parse_threshold(raw: &str) -> Result<U256> {
    parse_ether(raw.trim())
        .map_err(|e| anyhow::anyhow!("Invalid LARGE_WITHDRAWAL_THRESHOLD_ETH '{}': {}", raw, e))
}
