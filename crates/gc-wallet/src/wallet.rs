use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use k256::SecretKey;
use rand_core::OsRng;
use std::collections::BTreeMap;

use gc_ledger::Ledger;
use gc_transaction::Transaction;

use crate::address;
use crate::error::WalletError;

const PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// A single spendable identity: an ECDSA SECP256K1 keypair, the address
/// derived from it, and the nonce counter used to order this wallet's own
/// transactions. Holds no chain state of its own — balances and history are
/// always recomputed by replaying a [`Ledger`].
pub struct Wallet {
    signing_key: SigningKey,
    pub address: String,
    pub nonce: u64,
}

impl Wallet {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let address = address::derive(&compressed_point(&verifying_key));
        Self {
            signing_key,
            address,
            nonce: 0,
        }
    }

    /// Compressed SEC1 public key, hex-encoded, as embedded in signed
    /// transactions.
    pub fn public_key_hex(&self) -> String {
        hex::encode(compressed_point(&VerifyingKey::from(&self.signing_key)))
    }

    /// Build, sign, and return a transaction spending from this wallet,
    /// advancing its nonce. Does not submit it anywhere.
    pub fn create_transaction(
        &mut self,
        recipient: &str,
        amount: u64,
        fee: u64,
        data: Option<BTreeMap<String, String>>,
    ) -> Result<Transaction, WalletError> {
        if !address::validate(recipient) {
            return Err(WalletError::InvalidAddress);
        }
        if amount == 0 {
            return Err(WalletError::NonPositiveAmount);
        }

        let mut tx = Transaction::new(self.address.clone(), recipient.to_string(), amount, self.nonce, fee);
        tx.data = data;
        self.sign(&mut tx)?;
        self.nonce += 1;

        Ok(tx)
    }

    /// Sign `tx` in place: embeds this wallet's public key, then signs the
    /// resulting identity hash with ECDSA-SHA256.
    fn sign(&self, tx: &mut Transaction) -> Result<(), WalletError> {
        tx.signer_public_key = Some(self.public_key_hex());
        let digest = hex::decode(tx.identity_hash()?)?;
        let signature: Signature = self.signing_key.sign(&digest);
        tx.signature = BASE64.encode(signature.to_der().as_bytes());
        Ok(())
    }

    /// Verify a transaction's signature against its own embedded public key.
    /// Any malformed field — bad hex, bad DER, missing key — verifies false
    /// rather than erroring.
    pub fn verify(tx: &Transaction) -> bool {
        Self::try_verify(tx).unwrap_or(false)
    }

    fn try_verify(tx: &Transaction) -> Result<bool, WalletError> {
        let Some(pubkey_hex) = tx.signer_public_key.as_ref() else {
            return Ok(false);
        };
        let pubkey_bytes = hex::decode(pubkey_hex)?;
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(&pubkey_bytes) else {
            return Ok(false);
        };
        let Ok(sig_bytes) = BASE64.decode(&tx.signature) else {
            return Ok(false);
        };
        let Ok(signature) = Signature::from_der(&sig_bytes) else {
            return Ok(false);
        };
        let digest = hex::decode(tx.identity_hash()?)?;
        Ok(verifying_key.verify(&digest, &signature).is_ok())
    }

    /// Export this wallet's private key as a password-encrypted PKCS#8 PEM
    /// document, alongside its address and current nonce.
    pub fn export(&self, password: &str) -> Result<ExportedWallet, WalletError> {
        let secret_key = SecretKey::from(self.signing_key.clone());
        let pem = secret_key
            .to_pkcs8_encrypted_pem(&mut OsRng, password.as_bytes(), LineEnding::LF)
            .map_err(|e| WalletError::KeyLoad(e.to_string()))?;

        Ok(ExportedWallet {
            encrypted_private_key_pem: pem.to_string(),
            address: self.address.clone(),
            nonce: self.nonce,
        })
    }

    /// Recover a wallet from an [`ExportedWallet`] and its password. Fails if
    /// the password is wrong or the recovered key derives a different
    /// address than the one recorded at export time.
    pub fn import(exported: &ExportedWallet, password: &str) -> Result<Self, WalletError> {
        let secret_key = SecretKey::from_pkcs8_encrypted_pem(&exported.encrypted_private_key_pem, password.as_bytes())
            .map_err(|_| WalletError::Decrypt)?;

        let mut wallet = Self::from_signing_key(secret_key.into());
        wallet.nonce = exported.nonce;

        if wallet.address != exported.address {
            return Err(WalletError::AddressMismatch);
        }

        Ok(wallet)
    }

    /// Replay `ledger` and sum this wallet's net balance: credited on
    /// received transactions, debited by amount plus fee on sent ones.
    /// Deduplicated by identity hash so a transaction seen twice (e.g. across
    /// a reorg boundary) is only counted once. May be negative — this ledger
    /// has no genesis allocation.
    pub fn balance(&self, ledger: &Ledger) -> i128 {
        let mut balance: i128 = 0;
        let mut seen = std::collections::HashSet::new();

        for block in ledger.blocks() {
            for tx in &block.transactions {
                let Ok(hash) = tx.identity_hash() else { continue };
                if !seen.insert(hash) {
                    continue;
                }
                if tx.recipient == self.address {
                    balance += tx.amount as i128;
                }
                if tx.sender == self.address {
                    balance -= tx.amount as i128 + tx.fee as i128;
                }
            }
        }

        balance
    }

    /// This wallet's transaction history, newest first, with confirmation
    /// counts relative to the ledger's current height.
    pub fn transaction_history(&self, ledger: &Ledger) -> Vec<HistoryEntry> {
        let mut seen = std::collections::HashSet::new();
        let mut history = Vec::new();
        let tip = ledger.height();

        for (block_height, block) in ledger.blocks().iter().enumerate() {
            let block_height = block_height as u64;
            for tx in &block.transactions {
                let Ok(hash) = tx.identity_hash() else { continue };
                if !seen.insert(hash.clone()) {
                    continue;
                }
                if tx.sender != self.address && tx.recipient != self.address {
                    continue;
                }

                let direction = if tx.sender == self.address {
                    Direction::Sent
                } else {
                    Direction::Received
                };
                let counterparty = if tx.sender == self.address {
                    tx.recipient.clone()
                } else {
                    tx.sender.clone()
                };

                history.push(HistoryEntry {
                    hash,
                    direction,
                    counterparty,
                    amount: tx.amount,
                    fee: tx.fee,
                    timestamp: tx.timestamp,
                    block_height,
                    confirmations: tip.saturating_sub(block_height),
                });
            }
        }

        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }
}

fn compressed_point(key: &VerifyingKey) -> [u8; 33] {
    let encoded = key.to_encoded_point(true);
    let mut bytes = [0u8; 33];
    bytes.copy_from_slice(encoded.as_bytes());
    bytes
}

/// A wallet's persisted form: an encrypted private key plus the bookkeeping
/// needed to recover its nonce without replaying the chain.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportedWallet {
    pub encrypted_private_key_pem: String,
    pub address: String,
    pub nonce: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HistoryEntry {
    pub hash: String,
    pub direction: Direction,
    pub counterparty: String,
    pub amount: u64,
    pub fee: u64,
    pub timestamp: i64,
    pub block_height: u64,
    pub confirmations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_wallet_has_valid_address() {
        let wallet = Wallet::generate();
        assert!(address::validate(&wallet.address));
    }

    #[test]
    fn signed_transaction_verifies() {
        let mut wallet = Wallet::generate();
        let recipient = Wallet::generate();
        let tx = wallet
            .create_transaction(&recipient.address, 100, 1, None)
            .unwrap();
        assert!(Wallet::verify(&tx));
    }

    #[test]
    fn tampered_amount_fails_verification() {
        let mut wallet = Wallet::generate();
        let recipient = Wallet::generate();
        let mut tx = wallet
            .create_transaction(&recipient.address, 100, 1, None)
            .unwrap();
        tx.amount = 999;
        assert!(!Wallet::verify(&tx));
    }

    #[test]
    fn transaction_to_invalid_address_is_rejected() {
        let mut wallet = Wallet::generate();
        assert!(wallet.create_transaction("not-an-address", 10, 1, None).is_err());
    }

    #[test]
    fn zero_amount_is_rejected() {
        let mut wallet = Wallet::generate();
        let recipient = Wallet::generate();
        assert!(wallet.create_transaction(&recipient.address, 0, 1, None).is_err());
    }

    #[test]
    fn export_then_import_round_trips_identity() {
        let wallet = Wallet::generate();
        let exported = wallet.export("correct horse battery staple").unwrap();
        let imported = Wallet::import(&exported, "correct horse battery staple").unwrap();
        assert_eq!(wallet.address, imported.address);
    }

    #[test]
    fn import_with_wrong_password_fails() {
        let wallet = Wallet::generate();
        let exported = wallet.export("right password").unwrap();
        assert!(Wallet::import(&exported, "wrong password").is_err());
    }

    #[test]
    fn nonce_advances_per_transaction() {
        let mut wallet = Wallet::generate();
        let recipient = Wallet::generate();
        wallet.create_transaction(&recipient.address, 10, 1, None).unwrap();
        wallet.create_transaction(&recipient.address, 10, 1, None).unwrap();
        assert_eq!(wallet.nonce, 2);
    }
}
