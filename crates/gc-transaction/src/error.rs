use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("serialization error: {0}")]
    Serialization(#[from] gc_hash::HashError),

    #[error("sender and recipient must both be non-empty")]
    MissingParty,

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("transaction is unsigned")]
    Unsigned,
}
