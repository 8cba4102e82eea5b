use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// The sentinel value of `signature` and `sender` used only by the genesis
/// transaction, which predates any wallet and carries no real signature.
pub const GENESIS_SENDER: &str = "0";
pub const GENESIS_SIGNATURE: &str = "0";

/// A single transfer of `amount` base units from `sender` to `recipient`,
/// replayed against the whole chain to derive account balances (this system
/// has no UTXO set).
///
/// `signature` is base64-encoded DER over the SHA-256 identity hash of every
/// field except `signature` itself (see [`Transaction::identity_hash`]).
/// `signer_public_key` carries the signer's compressed SEC1 public key
/// (hex-encoded) so verification never needs an external key registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    /// Amount in fixed-point base units (see SPEC_FULL.md §9).
    pub amount: u64,
    /// Unix timestamp (seconds) when this transaction was created.
    pub timestamp: i64,
    /// Per-sender monotonic counter preventing replay.
    pub nonce: u64,
    /// Fee in the same base-unit denomination as `amount`.
    pub fee: u64,
    /// Opaque application data, canonically serialized alongside everything
    /// else when this transaction is hashed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
    /// Hex-encoded compressed SEC1 public key of the signer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_public_key: Option<String>,
    /// Base64 DER-encoded ECDSA signature. Empty until signed.
    #[serde(default)]
    pub signature: String,
}

impl Transaction {
    /// Construct a new, unsigned transaction with the current wall-clock
    /// timestamp. Callers sign it via `gc_wallet::Wallet::sign_transaction`
    /// before submitting it to a chain's mempool.
    pub fn new(sender: String, recipient: String, amount: u64, nonce: u64, fee: u64) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Self {
            sender,
            recipient,
            amount,
            timestamp,
            nonce,
            fee,
            data: None,
            signer_public_key: None,
            signature: String::new(),
        }
    }

    /// Build the fixed genesis transaction: `"0" → "Genesis"`, amount 0,
    /// signature `"0"`, timestamp 0.
    pub fn genesis() -> Self {
        Self {
            sender: GENESIS_SENDER.to_string(),
            recipient: "Genesis".to_string(),
            amount: 0,
            timestamp: 0,
            nonce: 0,
            fee: 0,
            data: None,
            signer_public_key: None,
            signature: GENESIS_SIGNATURE.to_string(),
        }
    }

    /// SHA-256 of the canonical serialization of this transaction with
    /// `signature` removed — the value that gets signed, and the value used
    /// to de-duplicate the mempool.
    pub fn identity_hash(&self) -> Result<String, TransactionError> {
        let mut value = serde_json::to_value(self).map_err(gc_hash::HashError::from)?;
        if let serde_json::Value::Object(ref mut map) = value {
            map.remove("signature");
        }
        Ok(gc_hash::hash_value(&value)?)
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Basic structural validation per SPEC_FULL.md §4.5: both endpoints
    /// non-empty, amount positive, signature present. Does not check the
    /// cryptographic validity of the signature — see `gc_wallet::verify`.
    pub fn validate_structure(&self) -> Result<(), TransactionError> {
        if self.sender.is_empty() || self.recipient.is_empty() {
            return Err(TransactionError::MissingParty);
        }
        if self.amount == 0 {
            return Err(TransactionError::NonPositiveAmount);
        }
        if !self.is_signed() {
            return Err(TransactionError::Unsigned);
        }
        Ok(())
    }
}
