use std::sync::atomic::{AtomicBool, Ordering};

/// Maximum nonce attempted before mining gives up on a block.
pub const MAX_NONCE: u64 = 1 << 32;

/// How often the cancellation flag is polled, in nonce attempts. Checking
/// every nonce would make the atomic load dominate mining throughput.
pub const CANCEL_CHECK_INTERVAL: u64 = 100_000;

/// The outcome of a mining attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    /// A nonce was found; its hash is returned so the caller doesn't need to
    /// recompute it.
    Found { nonce: u64, hash: String },
    /// `cancel` was set before a solution was found.
    Cancelled,
    /// `MAX_NONCE` was exhausted with no solution.
    Exhausted,
}

/// Search nonces `0..MAX_NONCE` for one whose hash (as produced by
/// `hash_for_nonce`) starts with `difficulty` `'0'` characters, checking
/// `cancel` periodically so a caller running this on a blocking thread can
/// interrupt it when a competing block arrives.
///
/// `hash_for_nonce` is given the candidate nonce and returns the hex hash the
/// block would have with that nonce; the caller owns the hashing scheme
/// (header layout, Merkle root, etc.) entirely.
pub fn mine<F>(difficulty: u32, cancel: &AtomicBool, mut hash_for_nonce: F) -> MineOutcome
where
    F: FnMut(u64) -> String,
{
    let target = "0".repeat(difficulty as usize);

    for nonce in 0..MAX_NONCE {
        if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            tracing::debug!(nonce, "mining cancelled");
            return MineOutcome::Cancelled;
        }

        let hash = hash_for_nonce(nonce);
        if hash.starts_with(&target) {
            tracing::info!(nonce, hash = %hash, "block mined");
            return MineOutcome::Found { nonce, hash };
        }
    }

    tracing::warn!("mining exhausted max nonce with no solution");
    MineOutcome::Exhausted
}

/// Check whether `hash` meets `difficulty`: starts with `difficulty` `'0'`
/// characters. Does not recompute or verify the hash itself.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    hash.starts_with(&"0".repeat(difficulty as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mine_finds_a_nonce_meeting_difficulty() {
        let cancel = AtomicBool::new(false);
        let outcome = mine(1, &cancel, |nonce| format!("{:x}", nonce.wrapping_mul(2654435761)));
        match outcome {
            MineOutcome::Found { hash, .. } => assert!(meets_difficulty(&hash, 1)),
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn mine_respects_cancellation() {
        let cancel = AtomicBool::new(true);
        let outcome = mine(8, &cancel, |nonce| format!("{nonce:x}"));
        assert_eq!(outcome, MineOutcome::Cancelled);
    }

    #[test]
    fn meets_difficulty_checks_prefix_length() {
        assert!(meets_difficulty("0000abcd", 4));
        assert!(!meets_difficulty("0001abcd", 4));
        assert!(meets_difficulty("anything", 0));
    }
}
