use alloy_primitives::{Address, B256, U256};

/// Where a decoded event came from on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOrigin {
    pub block_number: u64,
    pub transaction_hash: Option<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalCreated {
    pub proposal_id: U256,
    pub proposer: Address,
    pub description: String,
    pub origin: EventOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub token: Address,
    pub recipient: Address,
    pub amount: U256,
    pub timestamp: U256,
    pub origin: EventOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    ProposalCreated(ProposalCreated),
    Withdrawal(Withdrawal),
}

impl ChainEvent {
    pub fn origin(&self) -> &EventOrigin {
        match self {
            ChainEvent::ProposalCreated(p) => &p.origin,
            ChainEvent::Withdrawal(w) => &w.origin,
        }
    }
}

impl From<ProposalCreated> for ChainEvent {
    fn from(event: ProposalCreated) -> Self {
        ChainEvent::ProposalCreated(event)
    }
}

impl From<Withdrawal> for ChainEvent {
    fn from(event: Withdrawal) -> Self {
        ChainEvent::Withdrawal(event)
    }
}
