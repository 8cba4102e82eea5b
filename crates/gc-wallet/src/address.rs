use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

const VERSION_BYTE: u8 = 0x00;

/// Derive the Base58Check address for a compressed SEC1 public key:
/// `Base58(0x00 || RIPEMD160(SHA256(pubkey)) || checksum[0..4])`, where
/// `checksum = SHA256(SHA256(versioned))[0..4]`.
pub fn derive(public_key_compressed: &[u8]) -> String {
    let sha = Sha256::digest(public_key_compressed);
    let ripemd = Ripemd160::digest(sha);

    let mut versioned = Vec::with_capacity(21);
    versioned.push(VERSION_BYTE);
    versioned.extend_from_slice(&ripemd);

    let checksum = &Sha256::digest(Sha256::digest(&versioned))[..4];

    let mut payload = versioned;
    payload.extend_from_slice(checksum);

    bs58::encode(payload).into_string()
}

/// Validate that `address` decodes to 25 bytes with a matching checksum.
pub fn validate(address: &str) -> bool {
    let Ok(payload) = bs58::decode(address).into_vec() else {
        return false;
    };

    if payload.len() != 25 {
        return false;
    }

    let (versioned, checksum) = payload.split_at(21);
    let expected = &Sha256::digest(Sha256::digest(versioned))[..4];
    expected == checksum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_address_round_trips_through_validate() {
        let pubkey = [2u8; 33];
        let address = derive(&pubkey);
        assert!(validate(&address));
    }

    #[test]
    fn different_keys_derive_different_addresses() {
        let a = derive(&[2u8; 33]);
        let b = derive(&[3u8; 33]);
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_address_fails_validation() {
        let mut address = derive(&[2u8; 33]);
        address.push('x');
        assert!(!validate(&address));
    }

    #[test]
    fn garbage_input_fails_validation() {
        assert!(!validate("not-a-valid-address"));
        assert!(!validate(""));
    }
}
