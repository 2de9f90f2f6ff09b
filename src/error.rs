use thiserror::Error;

/// Failure of a single scan pass. Every variant is recoverable: the watcher
/// keeps its watermark, backs off and rescans the same range.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("RPC request failed: {0}")]
    Rpc(#[from] anyhow::Error),

    #[error("malformed {event} log: {reason}")]
    MalformedLog { event: &'static str, reason: String },
}

impl ScanError {
    pub fn malformed<T: Into<String>>(event: &'static str, reason: T) -> Self {
        Self::MalformedLog {
            event,
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            ScanError::Rpc(_) | ScanError::MalformedLog { .. } => true,
        }
    }
}

/// Failure while bringing the watcher up. Never retried.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("ledger unreachable at startup: {0}")]
    Unreachable(#[source] ScanError),
}
