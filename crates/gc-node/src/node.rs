use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use gc_ledger::{AddBlockOutcome, Block, Ledger};
use gc_sync::SyncManager;
use gc_transaction::Transaction;

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::event::NodeEvent;
use crate::peer::{PeerTable, CLEANUP_INTERVAL, GOSSIP_INTERVAL};
use crate::protocol::{decode, encode, GossipMessage};

const VERSION: &str = "1.0";

/// A UDP gossip node: owns the socket, the peer table, and a handle to the
/// chain state shared with the mining task under one logical mutex.
pub struct Node {
    node_id: Uuid,
    socket: Arc<UdpSocket>,
    ledger: Arc<AsyncMutex<Ledger>>,
    peers: PeerTable,
    known_transactions: HashSet<String>,
    known_blocks: HashSet<String>,
    sync: SyncManager,
    miner_address: String,
    mining_cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<NodeEvent>,
    mined: mpsc::UnboundedSender<()>,
    mined_rx: mpsc::UnboundedReceiver<()>,
    submit_tx: mpsc::UnboundedSender<Transaction>,
    submit_rx: mpsc::UnboundedReceiver<Transaction>,
}

impl Node {
    /// Bind the UDP socket and build a node ready to [`run`](Self::run).
    /// `miner_address` is credited whenever this node successfully mines a
    /// block.
    pub async fn new(
        config: NodeConfig,
        miner_address: String,
    ) -> Result<(Self, mpsc::UnboundedReceiver<NodeEvent>), NodeError> {
        let socket = UdpSocket::bind(("0.0.0.0", config.port)).await?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (mined_tx, mined_rx) = mpsc::unbounded_channel();
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();

        let node = Self {
            node_id: Uuid::new_v4(),
            socket: Arc::new(socket),
            ledger: Arc::new(AsyncMutex::new(Ledger::new(config.difficulty))),
            peers: PeerTable::new(),
            known_transactions: HashSet::new(),
            known_blocks: HashSet::new(),
            sync: SyncManager::new(config.sync_strategy.clone()),
            miner_address,
            mining_cancel: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(true)),
            events: events_tx,
            mined: mined_tx,
            mined_rx,
            submit_tx,
            submit_rx,
        };

        for peer in &config.bootstrap_peers {
            node.send_to(
                &GossipMessage::Hello {
                    node_id: node.node_id,
                    version: VERSION.to_string(),
                },
                *peer,
            )
            .await?;
        }

        Ok((node, events_rx))
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NodeError> {
        self.socket.local_addr().map_err(|_| NodeError::NotBound)
    }

    /// A cancellable handle for stopping this node's event loop and mining
    /// task from outside. Idempotent: setting it `false` more than once is
    /// harmless.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn ledger(&self) -> Arc<AsyncMutex<Ledger>> {
        self.ledger.clone()
    }

    /// A sender that can hand a locally created transaction to this node's
    /// event loop for mempool submission and gossip, from outside the loop
    /// (e.g. a wallet CLI running alongside it).
    pub fn submission_handle(&self) -> mpsc::UnboundedSender<Transaction> {
        self.submit_tx.clone()
    }

    async fn send_to(&self, msg: &GossipMessage, addr: SocketAddr) -> Result<(), NodeError> {
        let bytes = encode(msg)?;
        self.socket.send_to(&bytes, addr).await?;
        Ok(())
    }

    async fn broadcast(&self, msg: &GossipMessage) -> Result<(), NodeError> {
        let bytes = encode(msg)?;
        for addr in self.peers.addrs() {
            if let Err(err) = self.socket.send_to(&bytes, addr).await {
                warn!(%addr, %err, "gossip send failed");
            }
        }
        Ok(())
    }

    async fn broadcast_status(&self) -> Result<(), NodeError> {
        let height = self.ledger.lock().await.height();
        self.broadcast(&GossipMessage::Status {
            node_id: self.node_id,
            version: VERSION.to_string(),
            height,
        })
        .await
    }

    /// Submit a transaction as if it arrived locally: add to the mempool and
    /// gossip it once to all current peers.
    pub async fn submit_transaction(&mut self, tx: Transaction) -> Result<bool, NodeError> {
        let identity = tx.identity_hash().map_err(gc_ledger::LedgerError::from)?;

        let added = {
            let mut ledger = self.ledger.lock().await;
            ledger.add_transaction(tx.clone())?
        };
        if !added {
            return Ok(false);
        }

        self.known_transactions.insert(identity);
        self.broadcast(&GossipMessage::NewTransaction {
            node_id: self.node_id,
            transaction: tx,
        })
        .await?;
        Ok(true)
    }

    /// Spawn the mining task. Runs until `shutdown_handle()` is cleared;
    /// idles briefly when the mempool is empty rather than busy-looping.
    pub fn spawn_miner(&self) -> tokio::task::JoinHandle<()> {
        let ledger = self.ledger.clone();
        let miner_address = self.miner_address.clone();
        let cancel = self.mining_cancel.clone();
        let running = self.running.clone();
        let events = self.events.clone();
        let mined = self.mined.clone();

        tokio::spawn(async move {
            while running.load(Ordering::Relaxed) {
                match mine_once(&ledger, &miner_address, &cancel).await {
                    Ok(Some(block)) => {
                        let _ = events.send(NodeEvent::BlockMined(block));
                        let _ = mined.send(());
                    }
                    Ok(None) => {
                        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
                    }
                    Err(err) => {
                        warn!(%err, "mining attempt failed");
                        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
                    }
                }
            }
        })
    }

    /// The gossip event loop: dispatches inbound datagrams and drives the
    /// periodic STATUS broadcast and peer cleanup timers. Returns once
    /// `shutdown_handle()` is cleared.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        let mut gossip_ticker = interval(GOSSIP_INTERVAL);
        let mut cleanup_ticker = interval(CLEANUP_INTERVAL);
        let mut buf = vec![0u8; crate::protocol::MAX_PAYLOAD_BYTES + 1];

        let local_addr = self.local_addr()?;
        info!(addr = %local_addr, "node listening");
        let _ = self.events.send(NodeEvent::Listening(local_addr));

        while self.running.load(Ordering::Relaxed) {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, from)) => {
                            if let Err(err) = self.handle_datagram(&buf[..len], from).await {
                                debug!(%from, %err, "failed to handle inbound datagram");
                            }
                        }
                        Err(err) => warn!(%err, "udp recv failed"),
                    }
                }
                _ = gossip_ticker.tick() => {
                    if let Err(err) = self.broadcast_status().await {
                        warn!(%err, "periodic status broadcast failed");
                    }
                }
                _ = cleanup_ticker.tick() => {
                    for node_id in self.peers.evict_stale() {
                        let _ = self.events.send(NodeEvent::PeerEvicted { node_id });
                    }
                }
                Some(()) = self.mined_rx.recv() => {
                    if let Err(err) = self.broadcast_status().await {
                        warn!(%err, "post-mine status broadcast failed");
                    }
                }
                Some(tx) = self.submit_rx.recv() => {
                    if let Err(err) = self.submit_transaction(tx).await {
                        warn!(%err, "local transaction submission failed");
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr) -> Result<(), NodeError> {
        let msg = decode(bytes)?;

        match msg {
            GossipMessage::Hello { node_id, version } => {
                self.peers.upsert(node_id, from, version, 0);
                let _ = self.events.send(NodeEvent::PeerSeen { node_id, addr: from });
                let height = self.ledger.lock().await.height();
                self.send_to(
                    &GossipMessage::Status {
                        node_id: self.node_id,
                        version: VERSION.to_string(),
                        height,
                    },
                    from,
                )
                .await?;
            }

            GossipMessage::Status { node_id, version, height } => {
                if !self.peers.upsert(node_id, from, version, height) {
                    debug!(%from, "dropping STATUS from unadmitted peer: peer table full");
                    return Ok(());
                }
                let _ = self.events.send(NodeEvent::PeerSeen { node_id, addr: from });

                let local_height = self.ledger.lock().await.height();
                if height > local_height {
                    self.send_to(
                        &GossipMessage::GetBlocks {
                            node_id: self.node_id,
                            start: local_height,
                            end: None,
                        },
                        from,
                    )
                    .await?;
                }
            }

            GossipMessage::GetBlocks { node_id, start, end } => {
                self.peers.touch(&node_id, None);
                let owned: Vec<Block> = {
                    let ledger = self.ledger.lock().await;
                    let slice = ledger.blocks_from(start);
                    match end {
                        // `end` is an absolute chain index (chain[start:end]);
                        // `slice` is already relative to `start`, so the cut
                        // point is the relative count, not `end` itself.
                        Some(end) => {
                            let count = (end as usize).saturating_sub(start as usize);
                            if count < slice.len() {
                                slice[..count].to_vec()
                            } else {
                                slice.to_vec()
                            }
                        }
                        None => slice.to_vec(),
                    }
                };

                for batch in SyncManager::chunk_for_gossip(&owned, gc_sync::BLOCKS_CHUNK_BUDGET)? {
                    let blocks: Vec<Block> = batch.into_iter().cloned().collect();
                    self.send_to(
                        &GossipMessage::Blocks {
                            node_id: self.node_id,
                            blocks,
                        },
                        from,
                    )
                    .await?;
                }
            }

            GossipMessage::Blocks { node_id, blocks } => {
                self.peers.touch(&node_id, None);

                // A reply carrying a full chain from genesis is a
                // chain-replacement candidate, not just a run of blocks to
                // stream through add_block: a peer whose fork diverges
                // before our tip can only ever win by replacing our chain
                // outright, since each individual block would otherwise
                // fail the previous_hash-equals-tip check and sit in
                // pending forever. `replace_chain` is a no-op unless the
                // candidate is strictly longer, so re-offering the same
                // full chain repeatedly is harmless without extra dedup.
                let is_full_chain = blocks
                    .first()
                    .map(|b| b.previous_hash == "0".repeat(64))
                    .unwrap_or(false);

                if is_full_chain {
                    let mut ledger = self.ledger.lock().await;
                    if ledger.replace_chain(blocks) {
                        let new_height = ledger.height();
                        let _ = self.events.send(NodeEvent::ChainReplaced { new_height });
                    }
                    return Ok(());
                }

                let local_height = self.ledger.lock().await.height();
                let selected: Vec<Block> = self
                    .sync
                    .blocks_to_sync(local_height, local_height, &blocks)?
                    .into_iter()
                    .cloned()
                    .collect();

                let mut ledger = self.ledger.lock().await;
                for block in selected {
                    if !self.known_blocks.insert(block.hash.clone()) {
                        continue;
                    }
                    if let Err(err) = self.sync.record_download(&block) {
                        warn!(%err, "failed to account for downloaded block size");
                    }
                    let hash = block.hash.clone();
                    match ledger.add_block(block) {
                        Ok(AddBlockOutcome::Accepted) => {
                            let height = ledger.height();
                            let _ = self.events.send(NodeEvent::BlockAccepted { height, hash });
                        }
                        Ok(AddBlockOutcome::Pending) => {
                            let _ = self.events.send(NodeEvent::BlockPending { hash });
                        }
                        Ok(AddBlockOutcome::Rejected) => {
                            let _ = self.events.send(NodeEvent::BlockRejected { hash });
                        }
                        Err(err) => {
                            warn!(%hash, %err, "error offering gossiped block; peer not penalized");
                        }
                    }
                }
            }

            GossipMessage::NewTransaction { node_id, transaction } => {
                self.peers.touch(&node_id, None);
                let identity = match transaction.identity_hash() {
                    Ok(identity) => identity,
                    Err(err) => {
                        debug!(%err, "malformed transaction from gossip");
                        return Ok(());
                    }
                };

                if self.known_transactions.contains(&identity) {
                    return Ok(());
                }

                let added = {
                    let mut ledger = self.ledger.lock().await;
                    ledger.add_transaction(transaction.clone())?
                };

                self.known_transactions.insert(identity);

                if added {
                    let _ = self
                        .events
                        .send(NodeEvent::TransactionReceived(transaction.clone()));
                    self.broadcast(&GossipMessage::NewTransaction {
                        node_id: self.node_id,
                        transaction,
                    })
                    .await?;
                }
            }
        }

        Ok(())
    }
}

/// One mining attempt: snapshot the mempool and tip, mine off the async
/// runtime via `spawn_blocking`, then re-acquire the lock only to commit.
/// Holding the chain mutex for the entire PoW search would stall every
/// gossip handler that needs it for as long as mining takes.
async fn mine_once(
    ledger: &AsyncMutex<Ledger>,
    miner: &str,
    cancel: &Arc<AtomicBool>,
) -> Result<Option<Block>, NodeError> {
    let (candidate, difficulty) = {
        let guard = ledger.lock().await;
        let batch = guard.mempool_batch();
        if batch.is_empty() {
            return Ok(None);
        }
        let candidate = Block::new_candidate(
            guard.tip().hash.clone(),
            miner.to_string(),
            batch,
            guard.difficulty(),
        )?;
        (candidate, guard.difficulty())
    };

    cancel.store(false, Ordering::Relaxed);
    let cancel_for_blocking = cancel.clone();
    let mined = tokio::task::spawn_blocking(move || {
        let mut candidate = candidate;
        match gc_pow::mine(difficulty, &cancel_for_blocking, |nonce| candidate.hash_at_nonce(nonce)) {
            gc_pow::MineOutcome::Found { hash, .. } => {
                candidate.hash = hash;
                Some(candidate)
            }
            gc_pow::MineOutcome::Cancelled | gc_pow::MineOutcome::Exhausted => None,
        }
    })
    .await
    .expect("mining task panicked");

    let Some(block) = mined else {
        return Ok(None);
    };

    let mut guard = ledger.lock().await;
    match guard.complete_mined_block(block.clone())? {
        AddBlockOutcome::Accepted => Ok(Some(block)),
        // The tip moved while we were mining (a peer's block won the race).
        // Drop ours; the next attempt mines on the new tip.
        _ => Ok(None),
    }
}
