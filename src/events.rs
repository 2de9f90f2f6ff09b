use crate::domain::{EventOrigin, ProposalCreated, Withdrawal};
use crate::error::ScanError;
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

sol! {
    interface ProposalManager {
        event ProposalCreated(uint256 indexed proposalId, address indexed proposer, string description);

        function getProposalCount() external view returns (uint256);
        function proposals(uint256 proposalId) external view returns (
            uint256 id,
            address proposer,
            string description,
            uint256 forVotes,
            uint256 againstVotes,
            uint256 abstainVotes,
            uint256 startTime,
            uint256 endTime,
            uint8 status
        );
    }

    interface TreasuryManager {
        event Withdrawal(address indexed token, address indexed to, uint256 amount, uint256 timestamp);
    }

    interface CitizenRegistry {
        function getTotalCitizens() external view returns (uint256);
    }
}

pub const PROPOSAL_CREATED: &str = "ProposalCreated";
pub const WITHDRAWAL: &str = "Withdrawal";

fn origin_of(log: &Log, event: &'static str) -> Result<EventOrigin, ScanError> {
    let block_number = log
        .block_number
        .ok_or_else(|| ScanError::malformed(event, "missing block number"))?;
    Ok(EventOrigin {
        block_number,
        transaction_hash: log.transaction_hash,
    })
}

pub fn decode_proposal_created(log: &Log) -> Result<ProposalCreated, ScanError> {
    let log_data = log.data();
    let decoded = ProposalManager::ProposalCreated::decode_raw_log(log.topics(), &log_data.data)
        .map_err(|e| ScanError::malformed(PROPOSAL_CREATED, e.to_string()))?;
    Ok(ProposalCreated {
        proposal_id: decoded.proposalId,
        proposer: decoded.proposer,
        description: decoded.description,
        origin: origin_of(log, PROPOSAL_CREATED)?,
    })
}

pub fn decode_withdrawal(log: &Log) -> Result<Withdrawal, ScanError> {
    let log_data = log.data();
    let decoded = TreasuryManager::Withdrawal::decode_raw_log(log.topics(), &log_data.data)
        .map_err(|e| ScanError::malformed(WITHDRAWAL, e.to_string()))?;
    Ok(Withdrawal {
        token: decoded.token,
        recipient: decoded.to,
        amount: decoded.amount,
        timestamp: decoded.timestamp,
        origin: origin_of(log, WITHDRAWAL)?,
    })
}
