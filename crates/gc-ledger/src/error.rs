use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Merkle(#[from] gc_merkle::MerkleError),

    #[error(transparent)]
    Transaction(#[from] gc_transaction::TransactionError),

    #[error(transparent)]
    Hash(#[from] gc_hash::HashError),
}
