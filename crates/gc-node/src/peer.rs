use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Maximum number of simultaneously tracked peers.
pub const MAX_PEERS: usize = 10;

/// A peer is dropped once this long has passed since its `last_seen`.
pub const PEER_TIMEOUT: Duration = Duration::from_secs(300);

/// How often the cleanup task sweeps for timed-out peers.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// How often the gossip task broadcasts STATUS to all known peers.
pub const GOSSIP_INTERVAL: Duration = Duration::from_secs(30);

/// A remote node, keyed by its advertised [`Uuid`] in [`PeerTable`].
#[derive(Debug, Clone)]
pub struct Peer {
    pub addr: SocketAddr,
    pub version: String,
    pub height: u64,
    pub last_seen: Instant,
}

/// The gossip task's view of the network. Admission is first-come while
/// under [`MAX_PEERS`]; eviction is purely time-based. Mutated only by the
/// gossip task, so it carries no locking of its own.
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: HashMap<Uuid, Peer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, node_id: &Uuid) -> bool {
        self.peers.contains_key(node_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &Peer)> {
        self.peers.iter()
    }

    pub fn addrs(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.peers.values().map(|p| p.addr)
    }

    /// Register a peer (on HELLO) or refresh it (on any later valid
    /// message). Returns `false` without mutating anything if this is a new
    /// peer and the table is already at [`MAX_PEERS`].
    pub fn upsert(&mut self, node_id: Uuid, addr: SocketAddr, version: String, height: u64) -> bool {
        if !self.peers.contains_key(&node_id) && self.peers.len() >= MAX_PEERS {
            return false;
        }

        self.peers.insert(
            node_id,
            Peer {
                addr,
                version,
                height,
                last_seen: Instant::now(),
            },
        );
        true
    }

    /// Refresh `last_seen` (and height, if provided) for an already-known
    /// peer without risking admission failure. No-op if the peer is unknown.
    pub fn touch(&mut self, node_id: &Uuid, height: Option<u64>) {
        if let Some(peer) = self.peers.get_mut(node_id) {
            peer.last_seen = Instant::now();
            if let Some(height) = height {
                peer.height = height;
            }
        }
    }

    /// Remove every peer whose `last_seen` is older than [`PEER_TIMEOUT`].
    /// Returns the evicted node ids, for logging.
    pub fn evict_stale(&mut self) -> Vec<Uuid> {
        let now = Instant::now();
        let stale: Vec<Uuid> = self
            .peers
            .iter()
            .filter(|(_, p)| now.duration_since(p.last_seen) > PEER_TIMEOUT)
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            self.peers.remove(id);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn upsert_admits_new_peers_under_the_cap() {
        let mut table = PeerTable::new();
        assert!(table.upsert(Uuid::new_v4(), addr(9000), "1.0".into(), 0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn upsert_rejects_new_peers_once_full() {
        let mut table = PeerTable::new();
        for i in 0..MAX_PEERS {
            assert!(table.upsert(Uuid::new_v4(), addr(9000 + i as u16), "1.0".into(), 0));
        }
        assert!(!table.upsert(Uuid::new_v4(), addr(9999), "1.0".into(), 0));
        assert_eq!(table.len(), MAX_PEERS);
    }

    #[test]
    fn upsert_refreshes_an_existing_peer_even_when_full() {
        let mut table = PeerTable::new();
        let first = Uuid::new_v4();
        for i in 0..MAX_PEERS {
            let id = if i == 0 { first } else { Uuid::new_v4() };
            table.upsert(id, addr(9000 + i as u16), "1.0".into(), 0);
        }
        assert!(table.upsert(first, addr(9000), "1.0".into(), 5));
        assert_eq!(table.len(), MAX_PEERS);
    }

    #[test]
    fn evict_stale_removes_nothing_when_fresh() {
        let mut table = PeerTable::new();
        table.upsert(Uuid::new_v4(), addr(9000), "1.0".into(), 0);
        assert!(table.evict_stale().is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn touch_is_a_noop_for_unknown_peers() {
        let mut table = PeerTable::new();
        table.touch(&Uuid::new_v4(), Some(3));
        assert!(table.is_empty());
    }
}
