use crate::config::Config;
use crate::domain::{ChainEvent, ProposalCreated, Withdrawal};
use alloy_primitives::U256;
use alloy_primitives::utils::format_units;

pub const SNIPPET_CHARS: usize = 100;

/// Outcome of running one event through its rule. When `triggered` is false
/// the message is an informational line for the diagnostics stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub triggered: bool,
    pub message: String,
}

impl Verdict {
    fn alert(message: String) -> Self {
        Self {
            triggered: true,
            message,
        }
    }

    fn quiet(message: String) -> Self {
        Self {
            triggered: false,
            message,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertRules {
    keywords: Vec<String>,
    withdrawal_threshold: U256,
}

impl AlertRules {
    pub fn new<I, S>(keywords: I, withdrawal_threshold: U256) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            withdrawal_threshold,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.alert_keywords, config.withdrawal_threshold)
    }

    pub fn withdrawal_threshold(&self) -> U256 {
        self.withdrawal_threshold
    }

    pub fn classify(&self, event: &ChainEvent) -> Verdict {
        match event {
            ChainEvent::ProposalCreated(proposal) => self.check_proposal(proposal),
            ChainEvent::Withdrawal(withdrawal) => self.check_withdrawal(withdrawal),
        }
    }

    pub fn check_proposal(&self, proposal: &ProposalCreated) -> Verdict {
        if matches_keywords(&proposal.description, &self.keywords) {
            Verdict::alert(format_proposal_alert(proposal))
        } else {
            Verdict::quiet(format!(
                "New proposal {} detected (safe description)",
                proposal.proposal_id
            ))
        }
    }

    pub fn check_withdrawal(&self, withdrawal: &Withdrawal) -> Verdict {
        if withdrawal.amount >= self.withdrawal_threshold {
            Verdict::alert(format_withdrawal_alert(withdrawal))
        } else {
            Verdict::quiet(format!(
                "Normal withdrawal detected ({} ETH)",
                format_ether(withdrawal.amount)
            ))
        }
    }
}

pub fn matches_keywords(description: &str, keywords: &[String]) -> bool {
    let description = description.to_lowercase();
    keywords.iter().any(|kw| description.contains(kw.as_str()))
}

/// First [`SNIPPET_CHARS`] characters, cut on a char boundary.
pub fn description_snippet(description: &str) -> &str {
    match description.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => &description[..idx],
        None => description,
    }
}

/// Exact wei to ether conversion, without trailing zeros.
pub fn format_ether(amount: U256) -> String {
    let formatted = format_units(amount, 18u8).unwrap_or_else(|_| amount.to_string());
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

pub fn format_proposal_alert(proposal: &ProposalCreated) -> String {
    format!(
        "⚠️ POTENTIAL MALICIOUS PROPOSAL DETECTED!\nID: {}\nProposer: {}\nDescription Snippet: {}",
        proposal.proposal_id,
        proposal.proposer,
        description_snippet(&proposal.description)
    )
}

pub fn format_withdrawal_alert(withdrawal: &Withdrawal) -> String {
    let tx = withdrawal
        .origin
        .transaction_hash
        .map(|hash| format!("{hash:?}"))
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "🚩 LARGE WITHDRAWAL DETECTED!\nAmount: {} ETH\nTo: {}\nTx: {}",
        format_ether(withdrawal.amount),
        withdrawal.recipient,
        tx
    )
}
