use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to canonicalize value: {0}")]
    Canonicalize(#[from] serde_json::Error),
}
