use std::net::SocketAddr;

use uuid::Uuid;

use gc_ledger::Block;
use gc_transaction::Transaction;

/// High-level events emitted by a running [`crate::Node`] that callers can
/// subscribe to via a channel, mirroring its effect on chain or peer state
/// without requiring the subscriber to hold the chain lock itself.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// A peer registered or refreshed itself.
    PeerSeen { node_id: Uuid, addr: SocketAddr },

    /// A peer was dropped for inactivity.
    PeerEvicted { node_id: Uuid },

    /// A transaction from gossip was accepted into the mempool.
    TransactionReceived(Transaction),

    /// A gossiped block was appended to the main chain.
    BlockAccepted { height: u64, hash: String },

    /// A gossiped block is self-valid but parked, awaiting its predecessor.
    BlockPending { hash: String },

    /// A gossiped block failed self-integrity checks.
    BlockRejected { hash: String },

    /// The local chain was replaced by a longer one received via `BLOCKS`.
    ChainReplaced { new_height: u64 },

    /// A block was locally mined and appended.
    BlockMined(Block),

    /// The node finished binding its UDP socket and is ready to gossip.
    Listening(SocketAddr),
}
