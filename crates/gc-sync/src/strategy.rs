use serde::{Deserialize, Serialize};

/// Controls which of the peer's new blocks a node proactively pulls in a
/// `GET_BLOCKS` round, beyond the baseline "everything past our tip".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStrategy {
    /// Only pull blocks whose timestamp falls in `[from, to]`.
    TimeRange { from: i64, to: i64 },

    /// Stop pulling once the estimated serialized size of this session's
    /// downloaded blocks exceeds `max_bytes`.
    SizeLimit { max_bytes: u64 },

    /// Don't proactively request anything beyond the tip comparison that
    /// triggered this sync; defer to the node's ordinary gossip cadence.
    OnDemand,
}

impl Default for SyncStrategy {
    fn default() -> Self {
        Self::OnDemand
    }
}
