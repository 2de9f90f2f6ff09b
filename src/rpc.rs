use crate::config::Config;
use crate::utils::mask_url;
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy_primitives::{Address, B256, Bytes, U256};
use anyhow::Result;
use regex::Regex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<AlloyFullProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
    request_timeout: Duration,
    max_retries: usize,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String]) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }

        let mut providers = Vec::new();
        for url in rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", mask_url(url)))?;
            let provider: AlloyFullProvider = ProviderBuilder::new().connect_http(parsed_url);
            providers.push(provider);
        }

        Ok(RpcClient {
            providers,
            urls: rpc_urls.to_vec(),
            current_provider: Arc::new(AtomicUsize::new(0)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(&config.json_rpc_urls)?
            .with_request_timeout(config.rpc_timeout)
            .with_max_retries(config.rpc_max_retries))
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn get_provider(&self) -> &AlloyFullProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> String {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        mask_url(&self.urls[index])
    }

    pub fn rotate_provider(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.providers.len();
        self.current_provider.store(next, Ordering::Relaxed);

        if self.providers.len() > 1 {
            debug!("Rotating to RPC provider #{}", next);
        }
    }

    fn get_retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    fn handle_error(&self, operation: &str, error_str: &str) {
        warn!(
            "RPC {} failed on {}: {}, rotating provider",
            operation,
            self.get_current_url(),
            error_str
        );
        self.rotate_provider();
    }

    fn handle_timeout(&self, operation: &str) -> anyhow::Error {
        warn!(
            "RPC {} timed out after {} seconds on {}, rotating provider",
            operation,
            self.request_timeout.as_secs(),
            self.get_current_url()
        );
        self.rotate_provider();
        anyhow::anyhow!(
            "{} timed out after {} seconds",
            operation,
            self.request_timeout.as_secs()
        )
    }

    /// Runs one provider call under the request timeout, retrying with
    /// jittered backoff and rotating endpoints between attempts.
    async fn request<T, E, F, Fut>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Fn(AlloyFullProvider) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let this = self;
        let call = &call;
        Retry::start(self.get_retry_strategy(), move || async move {
            let provider = this.get_provider().clone();
            match timeout(this.request_timeout, call(provider)).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    let error_str = e.to_string();
                    this.handle_error(operation, &error_str);
                    Err(anyhow::anyhow!("{}", error_str))
                }
                Err(_) => Err(this.handle_timeout(operation)),
            }
        })
        .await
    }

    pub async fn get_latest_block(&self) -> Result<u64> {
        self.request("eth_blockNumber", |provider| async move {
            provider.get_block_number().await
        })
        .await
    }

    pub async fn get_block_timestamp(&self, block_number: u64) -> Result<u64> {
        let block = self
            .request("eth_getBlockByNumber", |provider| async move {
                provider
                    .get_block_by_number(BlockNumberOrTag::Number(block_number))
                    .await
            })
            .await?;

        block
            .map(|b| b.header.timestamp)
            .ok_or_else(|| anyhow::anyhow!("Block {} not found", block_number))
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        self.request("eth_getBalance", |provider| async move {
            provider.get_balance(address).await
        })
        .await
    }

    pub async fn call_contract<C: SolCall>(&self, address: Address, call: C) -> Result<C::Return> {
        let input = call.abi_encode();
        let output = self
            .request("eth_call", |provider| {
                let tx = TransactionRequest::default()
                    .to(address)
                    .input(Bytes::from(input.clone()).into());
                async move { provider.call(tx).await }
            })
            .await?;

        C::abi_decode_returns(&output)
            .map_err(|e| anyhow::anyhow!("Failed to decode {} result: {}", C::SIGNATURE, e))
    }

    async fn get_logs_internal(
        &self,
        from_block: u64,
        to_block: u64,
        contract_address: Address,
        topic0: B256,
    ) -> Result<Vec<Log>> {
        let client = self.clone();
        Retry::start(self.get_retry_strategy(), move || {
            let client = client.clone();
            async move {
                let provider = client.get_provider();
                let filter = Filter::new()
                    .address(contract_address)
                    .event_signature(topic0)
                    .from_block(from_block)
                    .to_block(to_block);

                match timeout(client.request_timeout, provider.get_logs(&filter)).await {
                    Ok(Ok(logs)) => Ok(Ok(logs)),
                    Ok(Err(e)) => {
                        let error_str = e.to_string();

                        if error_str.contains("exceeds max results") {
                            debug!(
                                "Max results exceeded for blocks {}-{}, will split range",
                                from_block, to_block
                            );
                            // not worth retrying, the caller splits the range instead
                            Ok(Err(anyhow::anyhow!("{}", e)))
                        } else {
                            client.handle_error("eth_getLogs", &error_str);
                            Err(anyhow::anyhow!("{}", e))
                        }
                    }
                    Err(_) => Err(client.handle_timeout("eth_getLogs")),
                }
            }
        })
        .await
        .and_then(|r| r)
    }

    fn parse_max_results_error(error_str: &str) -> Option<(u64, u64)> {
        let re = Regex::new(r"retry with the range (\d+)-(\d+)").ok()?;
        let captures = re.captures(error_str)?;

        let from = captures.get(1)?.as_str().parse().ok()?;
        let to = captures.get(2)?.as_str().parse().ok()?;

        Some((from, to))
    }

    /// Last block of the chunk to request after an "exceeds max results"
    /// error, never past `to_block`.
    fn split_end(error_str: &str, current_from: u64, to_block: u64) -> Option<u64> {
        if !error_str.contains("exceeds max results") {
            return None;
        }
        let (suggested_from, suggested_to) = Self::parse_max_results_error(error_str)?;
        if suggested_from != current_from || suggested_to < suggested_from {
            return None;
        }
        Some(suggested_to.min(to_block))
    }

    /// Fetches every log of `topic0` emitted by `contract_address` in
    /// `[from_block, to_block]`, splitting the range when the provider caps
    /// the result size.
    pub async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        contract_address: Address,
        topic0: B256,
    ) -> Result<Vec<Log>> {
        let mut all_logs = Vec::new();
        let mut current_from = from_block;

        while current_from <= to_block {
            match self
                .get_logs_internal(current_from, to_block, contract_address, topic0)
                .await
            {
                Ok(logs) => {
                    all_logs.extend(logs);
                    break;
                }
                Err(e) => {
                    let Some(split_end) = Self::split_end(&e.to_string(), current_from, to_block)
                    else {
                        return Err(e);
                    };

                    info!(
                        "Hit max results limit for blocks {}-{}, splitting at block {}",
                        current_from, to_block, split_end
                    );

                    let logs = self
                        .get_logs_internal(current_from, split_end, contract_address, topic0)
                        .await?;

                    all_logs.extend(logs);
                    match split_end.checked_add(1) {
                        Some(next) => current_from = next,
                        None => break,
                    }
                }
            }
        }

        Ok(all_logs)
    }
}
