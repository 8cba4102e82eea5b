use std::net::SocketAddr;
use std::path::PathBuf;

use gc_ledger::DEFAULT_DIFFICULTY;
use gc_sync::SyncStrategy;

/// Full configuration for a [`crate::Node`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// UDP port the node listens on. Not a consensus parameter; left to the
    /// operator. Defaults to `51025`.
    pub port: u16,

    /// Hash-prefix difficulty a freshly created chain starts at.
    pub difficulty: u32,

    /// Bootstrap peers contacted with `HELLO` on startup.
    pub bootstrap_peers: Vec<SocketAddr>,

    /// Path to a wallet file to load (or create) for mining rewards and
    /// signing outgoing transactions. `None` mines under an address derived
    /// from a freshly generated, unsaved wallet.
    pub wallet_path: Option<PathBuf>,

    /// Controls which blocks are proactively pulled beyond the tip
    /// comparison that triggers a sync.
    pub sync_strategy: SyncStrategy,

    /// When `true`, the binary embedding this node should suppress log
    /// output to stderr so the node runs silently. The library itself
    /// never initializes a tracing subscriber; this flag is a signal to
    /// the host binary.
    pub quiet: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 51025,
            difficulty: DEFAULT_DIFFICULTY,
            bootstrap_peers: Vec::new(),
            wallet_path: None,
            sync_strategy: SyncStrategy::default(),
            quiet: false,
        }
    }
}

impl NodeConfig {
    /// Create a config for a node on a specific port, otherwise default.
    pub fn on_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }
}
