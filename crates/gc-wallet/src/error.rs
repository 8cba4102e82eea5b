use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("recipient address is malformed or fails its checksum")]
    InvalidAddress,

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error(transparent)]
    Transaction(#[from] gc_transaction::TransactionError),

    #[error(transparent)]
    Hash(#[from] gc_hash::HashError),

    #[error("failed to decode hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("failed to decode base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("public key is malformed")]
    InvalidPublicKey,

    #[error("signature is malformed")]
    InvalidSignature,

    #[error("private key could not be loaded: {0}")]
    KeyLoad(String),

    #[error("wrong password or corrupted wallet file")]
    Decrypt,

    #[error("imported wallet address does not match its recovered key")]
    AddressMismatch,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
