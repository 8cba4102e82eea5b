use thiserror::Error;

#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("leaf hash not found in tree")]
    NotFound,

    #[error("transaction hashing failed: {0}")]
    HashFailed(String),
}
