pub mod formatters;

use crate::config::Config;
use crate::events::{CitizenRegistry, ProposalManager};
use crate::rules::format_ether;
use crate::rpc::RpcClient;
use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct SnapshotContracts {
    pub proposal_manager: Address,
    pub citizen_registry: Address,
    pub treasury_manager: Address,
}

impl SnapshotContracts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            proposal_manager: config.proposal_manager_address,
            citizen_registry: config.citizen_registry_address,
            treasury_manager: config.treasury_manager_address,
        }
    }

    fn by_name(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("CitizenRegistry".to_string(), self.citizen_registry.to_string()),
            ("ProposalManager".to_string(), self.proposal_manager.to_string()),
            ("TreasuryManager".to_string(), self.treasury_manager.to_string()),
        ])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DaoSnapshot {
    pub timestamp: DateTime<Utc>,
    pub network: String,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub contracts: BTreeMap<String, String>,
    pub data: SnapshotData,
}

/// Amounts are decimal strings so they survive JSON readers limited to f64.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotData {
    pub proposals: Vec<ProposalRecord>,
    pub citizens_count: String,
    pub treasury_balance: String,
    pub treasury_balance_eth: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposalRecord {
    pub id: String,
    pub proposer: String,
    pub description: String,
    pub votes: Votes,
    pub timeline: Timeline,
    pub status: u8,
    pub status_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Votes {
    #[serde(rename = "for")]
    pub for_votes: String,
    pub against: String,
    pub abstain: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub start: String,
    pub end: String,
}

pub fn status_label(status: u8) -> &'static str {
    match status {
        0 => "Pending",
        1 => "Active",
        2 => "Canceled",
        3 => "Defeated",
        4 => "Succeeded",
        5 => "Queued",
        6 => "Expired",
        7 => "Executed",
        _ => "Unknown",
    }
}

impl From<ProposalManager::proposalsReturn> for ProposalRecord {
    fn from(p: ProposalManager::proposalsReturn) -> Self {
        Self {
            id: p.id.to_string(),
            proposer: p.proposer.to_string(),
            description: p.description,
            votes: Votes {
                for_votes: p.forVotes.to_string(),
                against: p.againstVotes.to_string(),
                abstain: p.abstainVotes.to_string(),
            },
            timeline: Timeline {
                start: p.startTime.to_string(),
                end: p.endTime.to_string(),
            },
            status: p.status,
            status_label: status_label(p.status),
        }
    }
}

pub async fn export_snapshot(
    client: &RpcClient,
    contracts: &SnapshotContracts,
    network: &str,
) -> Result<DaoSnapshot> {
    let block_number = client.get_latest_block().await?;
    let block_timestamp = client.get_block_timestamp(block_number).await?;
    info!("Taking snapshot at block {}", block_number);

    let count = client
        .call_contract(
            contracts.proposal_manager,
            ProposalManager::getProposalCountCall {},
        )
        .await
        .context("Failed to read proposal count")?;
    let count = u64::try_from(count)
        .map_err(|_| anyhow::anyhow!("Proposal count {} does not fit in u64", count))?;
    info!("Exporting {} proposals...", count);

    let mut proposals = Vec::new();
    for id in 1..=count {
        let proposal = client
            .call_contract(
                contracts.proposal_manager,
                ProposalManager::proposalsCall {
                    proposalId: U256::from(id),
                },
            )
            .await
            .with_context(|| format!("Failed to read proposal {id}"))?;
        proposals.push(ProposalRecord::from(proposal));
    }

    let citizens_count = client
        .call_contract(
            contracts.citizen_registry,
            CitizenRegistry::getTotalCitizensCall {},
        )
        .await
        .context("Failed to read citizen count")?;

    let treasury_balance = client
        .get_balance(contracts.treasury_manager)
        .await
        .context("Failed to read treasury balance")?;

    Ok(DaoSnapshot {
        timestamp: Utc::now(),
        network: network.to_string(),
        block_number,
        block_timestamp,
        contracts: contracts.by_name(),
        data: SnapshotData {
            proposals,
            citizens_count: citizens_count.to_string(),
            treasury_balance: treasury_balance.to_string(),
            treasury_balance_eth: format_ether(treasury_balance),
        },
    })
}

pub fn default_filename(now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "emergency_snapshot_{}.json",
        now.format("%Y%m%d_%H%M%S")
    ))
}

pub fn write_snapshot(snapshot: &DaoSnapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
    Ok(())
}
