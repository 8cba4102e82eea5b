use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("payload of {0} bytes exceeds the 64 KiB gossip bound")]
    PayloadTooLarge(usize),

    #[error("ledger error: {0}")]
    Ledger(#[from] gc_ledger::LedgerError),

    #[error("sync error: {0}")]
    Sync(#[from] gc_sync::SyncError),

    #[error("wallet error: {0}")]
    Wallet(#[from] gc_wallet::WalletError),

    #[error("no bound socket address available")]
    NotBound,
}
