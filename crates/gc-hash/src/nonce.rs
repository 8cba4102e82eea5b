use rand::RngCore;

/// Generate a cryptographically secure random hex-encoded nonce of
/// `byte_length` bytes. Used for opaque random identifiers (gossip
/// message dedup keys, wallet-side tokens) — distinct from the PoW
/// mining nonce in `gc-pow`, which is a plain counter.
pub fn generate_nonce(byte_length: usize) -> String {
    let mut buf = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_has_expected_hex_length() {
        let n = generate_nonce(32);
        assert_eq!(n.len(), 64);
    }

    #[test]
    fn nonces_are_not_trivially_repeated() {
        let a = generate_nonce(32);
        let b = generate_nonce(32);
        assert_ne!(a, b);
    }
}
