use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid time range: from > to")]
    InvalidTimeRange,

    #[error("failed to estimate serialized block size: {0}")]
    Serialization(#[from] serde_json::Error),
}
