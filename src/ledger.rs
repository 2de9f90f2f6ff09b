use crate::config::Config;
use crate::domain::{ProposalCreated, Withdrawal};
use crate::error::ScanError;
use crate::events::{ProposalManager, TreasuryManager, decode_proposal_created, decode_withdrawal};
use crate::rpc::RpcClient;
use alloy::sol_types::SolEvent;
use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::debug;

/// What the watcher needs from the chain. Ranges are inclusive on both ends.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn latest_block(&self) -> Result<u64, ScanError>;

    async fn proposals_created(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ProposalCreated>, ScanError>;

    async fn withdrawals(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Withdrawal>, ScanError>;
}

/// The proposal manager and treasury contracts, read through JSON-RPC.
pub struct GovernanceLedger {
    client: RpcClient,
    proposal_manager: Address,
    treasury_manager: Address,
}

impl GovernanceLedger {
    pub fn new(client: RpcClient, proposal_manager: Address, treasury_manager: Address) -> Self {
        Self {
            client,
            proposal_manager,
            treasury_manager,
        }
    }

    pub fn from_config(client: RpcClient, config: &Config) -> Self {
        Self::new(
            client,
            config.proposal_manager_address,
            config.treasury_manager_address,
        )
    }
}

#[async_trait]
impl EventSource for GovernanceLedger {
    async fn latest_block(&self) -> Result<u64, ScanError> {
        Ok(self.client.get_latest_block().await?)
    }

    async fn proposals_created(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ProposalCreated>, ScanError> {
        let logs = self
            .client
            .get_logs(
                from_block,
                to_block,
                self.proposal_manager,
                ProposalManager::ProposalCreated::SIGNATURE_HASH,
            )
            .await?;
        debug!(
            "Received {} ProposalCreated logs for blocks {} to {}",
            logs.len(),
            from_block,
            to_block
        );

        logs.iter().map(decode_proposal_created).collect()
    }

    async fn withdrawals(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Withdrawal>, ScanError> {
        let logs = self
            .client
            .get_logs(
                from_block,
                to_block,
                self.treasury_manager,
                TreasuryManager::Withdrawal::SIGNATURE_HASH,
            )
            .await?;
        debug!(
            "Received {} Withdrawal logs for blocks {} to {}",
            logs.len(),
            from_block,
            to_block
        );

        logs.iter().map(decode_withdrawal).collect()
    }
}
