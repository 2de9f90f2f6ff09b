use alloy_primitives::{Address, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use governance_sentinel::config::DEFAULT_KEYWORDS;
use governance_sentinel::domain::{EventOrigin, ProposalCreated, Withdrawal};
use governance_sentinel::error::{ScanError, StartupError};
use governance_sentinel::ledger::EventSource;
use governance_sentinel::notifier::{AlertDispatcher, AlertSink};
use governance_sentinel::rules::AlertRules;
use governance_sentinel::watcher::{ScanOutcome, Watcher, WatcherSettings, WatcherState};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

#[derive(Default)]
struct LedgerState {
    head: u64,
    head_calls: usize,
    failing_heads: usize,
    failing_withdrawals: usize,
    proposals: Vec<ProposalCreated>,
    withdrawals: Vec<Withdrawal>,
    requested: Vec<(&'static str, u64, u64)>,
}

#[derive(Clone, Default)]
struct FakeLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl FakeLedger {
    fn at_height(head: u64) -> Self {
        let ledger = Self::default();
        ledger.set_head(head);
        ledger
    }

    fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    fn fail_next_heads(&self, count: usize) {
        self.state.lock().unwrap().failing_heads = count;
    }

    fn fail_next_withdrawals(&self, count: usize) {
        self.state.lock().unwrap().failing_withdrawals = count;
    }

    fn add_proposal(&self, block_number: u64, id: u64, description: &str) {
        self.state.lock().unwrap().proposals.push(ProposalCreated {
            proposal_id: U256::from(id),
            proposer: Address::repeat_byte(0x0b),
            description: description.to_string(),
            origin: EventOrigin {
                block_number,
                transaction_hash: Some(B256::repeat_byte(block_number as u8)),
            },
        });
    }

    fn add_withdrawal(&self, block_number: u64, amount: U256) {
        self.state.lock().unwrap().withdrawals.push(Withdrawal {
            token: Address::ZERO,
            recipient: Address::repeat_byte(0x0c),
            amount,
            timestamp: U256::from(1_700_000_000u64),
            origin: EventOrigin {
                block_number,
                transaction_hash: Some(B256::repeat_byte(0xee)),
            },
        });
    }

    fn requested(&self) -> Vec<(&'static str, u64, u64)> {
        self.state.lock().unwrap().requested.clone()
    }

    fn head_calls(&self) -> usize {
        self.state.lock().unwrap().head_calls
    }
}

#[async_trait]
impl EventSource for FakeLedger {
    async fn latest_block(&self) -> Result<u64, ScanError> {
        let mut state = self.state.lock().unwrap();
        state.head_calls += 1;
        if state.failing_heads > 0 {
            state.failing_heads -= 1;
            return Err(ScanError::Rpc(anyhow::anyhow!("connection refused")));
        }
        Ok(state.head)
    }

    async fn proposals_created(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ProposalCreated>, ScanError> {
        let mut state = self.state.lock().unwrap();
        state.requested.push(("proposals", from_block, to_block));
        Ok(state
            .proposals
            .iter()
            .filter(|p| (from_block..=to_block).contains(&p.origin.block_number))
            .cloned()
            .collect())
    }

    async fn withdrawals(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Withdrawal>, ScanError> {
        let mut state = self.state.lock().unwrap();
        state.requested.push(("withdrawals", from_block, to_block));
        if state.failing_withdrawals > 0 {
            state.failing_withdrawals -= 1;
            return Err(ScanError::malformed("Withdrawal", "unexpected response"));
        }
        Ok(state
            .withdrawals
            .iter()
            .filter(|w| (from_block..=to_block).contains(&w.origin.block_number))
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    received: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        self.received.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

struct BrokenSink;

#[async_trait]
impl AlertSink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    async fn deliver(&self, _message: &str) -> Result<()> {
        anyhow::bail!("503 Service Unavailable")
    }
}

fn rules() -> AlertRules {
    AlertRules::new(DEFAULT_KEYWORDS, U256::from(ONE_ETHER))
}

async fn watcher_with_sinks(
    ledger: &FakeLedger,
    sinks: Vec<Box<dyn AlertSink>>,
) -> Watcher<FakeLedger> {
    Watcher::initialize(
        ledger.clone(),
        rules(),
        AlertDispatcher::new(sinks),
        WatcherSettings::default(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn malicious_proposal_raises_one_alert_and_advances_watermark() {
    let ledger = FakeLedger::at_height(100);
    let sink = RecordingSink::default();
    let mut watcher = watcher_with_sinks(&ledger, vec![Box::new(sink.clone())]).await;
    assert_eq!(watcher.watermark(), 100);

    ledger.set_head(105);
    ledger.add_proposal(103, 7, "Backdoor access for admins");

    let outcome = watcher.scan_once().await.unwrap();

    assert_eq!(
        outcome,
        ScanOutcome::Scanned {
            from_block: 101,
            to_block: 105,
            events: 1,
            alerts: 1,
        }
    );
    assert_eq!(watcher.watermark(), 105);

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("ID: 7"));
    assert!(messages[0].contains(&Address::repeat_byte(0x0b).to_string()));
    assert!(messages[0].contains("Description Snippet: Backdoor access for admins"));
}

#[tokio::test]
async fn consecutive_passes_scan_adjacent_ranges() {
    let ledger = FakeLedger::at_height(10);
    let mut watcher = watcher_with_sinks(&ledger, Vec::new()).await;

    ledger.set_head(15);
    watcher.scan_once().await.unwrap();
    assert_eq!(
        watcher.scan_once().await.unwrap(),
        ScanOutcome::Idle { head: 15 }
    );
    ledger.set_head(20);
    watcher.scan_once().await.unwrap();

    assert_eq!(
        ledger.requested(),
        vec![
            ("proposals", 11, 15),
            ("withdrawals", 11, 15),
            ("proposals", 16, 20),
            ("withdrawals", 16, 20),
        ]
    );
    assert_eq!(watcher.watermark(), 20);
}

#[tokio::test]
async fn head_behind_watermark_never_moves_it_back() {
    let ledger = FakeLedger::at_height(50);
    let mut watcher = watcher_with_sinks(&ledger, Vec::new()).await;

    ledger.set_head(48);
    assert_eq!(
        watcher.scan_once().await.unwrap(),
        ScanOutcome::Idle { head: 48 }
    );
    assert_eq!(watcher.watermark(), 50);
    assert!(ledger.requested().is_empty());
}

#[tokio::test]
async fn failed_withdrawal_fetch_keeps_watermark_and_rescans() {
    let ledger = FakeLedger::at_height(100);
    let sink = RecordingSink::default();
    let mut watcher = watcher_with_sinks(&ledger, vec![Box::new(sink.clone())]).await;

    ledger.set_head(110);
    ledger.add_proposal(105, 3, "drain the treasury");
    ledger.fail_next_withdrawals(1);

    let err = watcher.scan_once().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(watcher.watermark(), 100);
    assert!(sink.messages().is_empty());

    watcher.scan_once().await.unwrap();
    assert_eq!(watcher.watermark(), 110);
    assert_eq!(sink.messages().len(), 1);

    let ranges = ledger.requested();
    assert_eq!(ranges[0], ("proposals", 101, 110));
    assert_eq!(ranges[2], ("proposals", 101, 110));
}

#[tokio::test]
async fn large_withdrawal_alert_has_exact_amount() {
    let ledger = FakeLedger::at_height(1);
    let sink = RecordingSink::default();
    let mut watcher = watcher_with_sinks(&ledger, vec![Box::new(sink.clone())]).await;

    ledger.set_head(3);
    ledger.add_withdrawal(2, U256::from(2 * ONE_ETHER));
    ledger.add_withdrawal(3, U256::from(ONE_ETHER - 1));

    let outcome = watcher.scan_once().await.unwrap();
    assert!(matches!(
        outcome,
        ScanOutcome::Scanned {
            events: 2,
            alerts: 1,
            ..
        }
    ));

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Amount: 2 ETH"));
    assert!(messages[0].contains(&Address::repeat_byte(0x0c).to_string()));
    assert!(messages[0].contains(&format!("{:?}", B256::repeat_byte(0xee))));
}

#[tokio::test]
async fn broken_sink_does_not_stop_delivery_or_the_scan() {
    let ledger = FakeLedger::at_height(1);
    let sink = RecordingSink::default();
    let mut watcher =
        watcher_with_sinks(&ledger, vec![Box::new(BrokenSink), Box::new(sink.clone())]).await;

    ledger.set_head(2);
    ledger.add_proposal(2, 1, "steal everything");

    watcher.scan_once().await.unwrap();
    assert_eq!(sink.messages().len(), 1);
    assert_eq!(watcher.watermark(), 2);
}

#[tokio::test]
async fn unreachable_ledger_at_startup_is_fatal() {
    let ledger = FakeLedger::at_height(1);
    ledger.fail_next_heads(1);

    let result = Watcher::initialize(
        ledger,
        rules(),
        AlertDispatcher::new(Vec::new()),
        WatcherSettings::default(),
    )
    .await;

    assert!(matches!(result, Err(StartupError::Unreachable(_))));
}

#[tokio::test]
async fn tick_switches_between_scanning_and_backoff() {
    let ledger = FakeLedger::at_height(5);
    let mut watcher = watcher_with_sinks(&ledger, Vec::new()).await;

    ledger.fail_next_heads(1);
    assert_eq!(watcher.tick().await, Duration::from_secs(30));
    assert_eq!(watcher.state(), WatcherState::Backoff);

    assert_eq!(watcher.tick().await, Duration::from_secs(15));
    assert_eq!(watcher.state(), WatcherState::Scanning);
}

#[tokio::test(start_paused = true)]
async fn run_forever_backs_off_after_errors() {
    let ledger = FakeLedger::at_height(5);
    let mut watcher = watcher_with_sinks(&ledger, Vec::new()).await;
    let calls_at_start = ledger.head_calls();

    // t=0 fails, t=30 succeeds, the next pass would be at t=45
    ledger.fail_next_heads(1);
    let result = tokio::time::timeout(Duration::from_secs(40), watcher.run_forever()).await;

    assert!(result.is_err());
    assert_eq!(ledger.head_calls() - calls_at_start, 2);
    assert_eq!(watcher.state(), WatcherState::Scanning);
    assert_eq!(watcher.watermark(), 5);
}
