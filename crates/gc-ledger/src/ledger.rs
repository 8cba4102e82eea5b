use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;

use gc_transaction::Transaction;

use crate::{block::Block, error::LedgerError};

/// Default hash-prefix difficulty for a freshly created chain.
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Maximum number of mempool entries bundled into a single mined block.
pub const MAX_TX_PER_BLOCK: usize = 10;

/// Result of offering a block to [`Ledger::add_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddBlockOutcome {
    /// Linked to the current tip, appended, and any pending blocks that
    /// linked to it were drained in too.
    Accepted,
    /// Self-valid but its predecessor isn't the tip yet; parked in the
    /// pending set.
    Pending,
    /// Failed self-integrity (bad hash, bad PoW, or bad Merkle root).
    Rejected,
}

/// The chain state machine: genesis block, main chain, mempool, and the
/// pending set of valid-but-disconnected blocks. Owns the difficulty used
/// for new candidates and the only copy of chain history.
///
/// Carries no locking of its own — callers that share a `Ledger` across
/// tasks (gossip loop, mining task) are expected to wrap it in a single
/// logical mutex, per the concurrency model this system follows.
#[derive(Debug, Clone)]
pub struct Ledger {
    blocks: Vec<Block>,
    mempool: Vec<Transaction>,
    known_transactions: HashSet<String>,
    pending: HashMap<String, Block>,
    difficulty: u32,
}

impl Ledger {
    pub fn new(difficulty: u32) -> Self {
        Self {
            blocks: vec![Block::genesis(difficulty)],
            mempool: Vec::new(),
            known_transactions: HashSet::new(),
            pending: HashMap::new(),
            difficulty,
        }
    }

    pub fn tip(&self) -> &Block {
        // Invariant: `blocks` always holds at least the genesis block.
        self.blocks.last().expect("chain always has a genesis block")
    }

    /// Chain length, including genesis. Doubles as the `height` advertised
    /// in `STATUS` messages.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// All blocks from `start` (inclusive) onward, for serving `GET_BLOCKS`.
    pub fn blocks_from(&self, start: u64) -> &[Block] {
        let start = start as usize;
        if start >= self.blocks.len() {
            &[]
        } else {
            &self.blocks[start..]
        }
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn mempool(&self) -> &[Transaction] {
        &self.mempool
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Offer a transaction to the mempool. Returns `Ok(false)` without error
    /// when the transaction's identity hash is already known — this call is
    /// idempotent, not an error.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<bool, LedgerError> {
        let identity = tx.identity_hash()?;
        if self.known_transactions.contains(&identity) {
            return Ok(false);
        }

        tx.validate_structure()?;

        self.known_transactions.insert(identity);
        self.mempool.push(tx);
        Ok(true)
    }

    /// Take up to [`MAX_TX_PER_BLOCK`] mempool entries, mine a block on top
    /// of the current tip, and append it. Returns `Ok(None)` if the mempool
    /// is empty or mining was cancelled/exhausted; the taken transactions
    /// are restored to the mempool in that case.
    pub fn mine(&mut self, miner: &str, cancel: &AtomicBool) -> Result<Option<Block>, LedgerError> {
        if self.mempool.is_empty() {
            return Ok(None);
        }

        let take = self.mempool.len().min(MAX_TX_PER_BLOCK);
        let batch: Vec<Transaction> = self.mempool[..take].to_vec();

        let mut candidate = Block::new_candidate(
            self.tip().hash.clone(),
            miner.to_string(),
            batch,
            self.difficulty,
        )?;

        match gc_pow::mine(self.difficulty, cancel, |nonce| candidate.hash_at_nonce(nonce)) {
            gc_pow::MineOutcome::Found { hash, .. } => {
                candidate.hash = hash;
                self.mempool.drain(..take);

                match self.add_block(candidate.clone())? {
                    AddBlockOutcome::Accepted => Ok(Some(candidate)),
                    // A just-mined block always links to our own tip; this
                    // branch would only fire under concurrent mutation,
                    // which the caller's mutex is meant to prevent.
                    _ => Ok(None),
                }
            }
            gc_pow::MineOutcome::Cancelled | gc_pow::MineOutcome::Exhausted => Ok(None),
        }
    }

    /// Snapshot up to [`MAX_TX_PER_BLOCK`] mempool entries without removing
    /// them. Used by callers that mine on a separate task and only want to
    /// hold the chain lock for the snapshot and the final commit, not for
    /// the PoW search itself.
    pub fn mempool_batch(&self) -> Vec<Transaction> {
        let take = self.mempool.len().min(MAX_TX_PER_BLOCK);
        self.mempool[..take].to_vec()
    }

    /// Commit a block mined externally (e.g. on a `spawn_blocking` task) from
    /// a [`Self::mempool_batch`] snapshot. Strips the now-confirmed
    /// transactions out of the mempool by identity hash before delegating to
    /// [`Self::add_block`], so a transaction that arrived again via gossip
    /// while mining was in flight isn't silently lost.
    pub fn complete_mined_block(&mut self, block: Block) -> Result<AddBlockOutcome, LedgerError> {
        let mined_ids: HashSet<String> = block
            .transactions
            .iter()
            .filter_map(|tx| tx.identity_hash().ok())
            .collect();
        self.mempool
            .retain(|tx| !matches!(tx.identity_hash(), Ok(id) if mined_ids.contains(&id)));
        self.add_block(block)
    }

    /// Offer a received block. See module docs on [`AddBlockOutcome`] for the
    /// three possible results.
    pub fn add_block(&mut self, block: Block) -> Result<AddBlockOutcome, LedgerError> {
        if !block.is_valid() {
            tracing::warn!(hash = %block.hash, "rejecting block: failed self-integrity check");
            return Ok(AddBlockOutcome::Rejected);
        }

        if block.previous_hash == self.tip().hash {
            self.blocks.push(block);
            self.drain_pending();
            self.maybe_retarget();
            Ok(AddBlockOutcome::Accepted)
        } else {
            tracing::debug!(hash = %block.hash, previous_hash = %block.previous_hash, "parking block in pending set");
            self.pending.insert(block.hash.clone(), block);
            Ok(AddBlockOutcome::Pending)
        }
    }

    /// After every successful append, scan the pending set for a block whose
    /// `previous_hash` now equals our tip; repeat until a full pass finds
    /// nothing. Pending blocks were already self-validated when first
    /// offered, so only linkage needs rechecking here.
    fn drain_pending(&mut self) {
        loop {
            let tip_hash = self.tip().hash.clone();
            let next_key = self
                .pending
                .iter()
                .find(|(_, b)| b.previous_hash == tip_hash)
                .map(|(k, _)| k.clone());

            let Some(key) = next_key else { break };
            let block = self.pending.remove(&key).expect("key was just found");
            self.blocks.push(block);
        }
    }

    /// At every [`gc_pow::RETARGET_WINDOW`]-block boundary, ask
    /// `gc_pow::adjust_difficulty` whether the window's mean block time
    /// warrants a change and apply it if so.
    fn maybe_retarget(&mut self) {
        let height = self.blocks.len();
        if height == 0 || height % gc_pow::RETARGET_WINDOW != 0 {
            return;
        }

        let window = &self.blocks[height - gc_pow::RETARGET_WINDOW..height];
        let timestamps: Vec<i64> = window.iter().map(|b| b.timestamp).collect();

        if let Some(new_difficulty) = gc_pow::adjust_difficulty(self.difficulty, &timestamps) {
            tracing::info!(from = self.difficulty, to = new_difficulty, "retargeting difficulty");
            self.difficulty = new_difficulty;
        }
    }

    /// Replace the local chain with `candidate` if it shares our genesis
    /// hash, is internally valid, and is strictly longer. Used both for
    /// `BLOCKS` gossip replies and test fixtures.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> bool {
        if candidate.len() <= self.blocks.len() {
            return false;
        }

        let Some(genesis) = candidate.first() else {
            return false;
        };
        if genesis.hash != self.blocks[0].hash {
            return false;
        }

        for window in candidate.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if !next.is_valid() || next.previous_hash != prev.hash {
                return false;
            }
        }

        self.blocks = candidate;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc_transaction::Transaction;
    use std::sync::atomic::AtomicBool;

    fn signed_tx(sender: &str, recipient: &str, amount: u64, nonce: u64) -> Transaction {
        let mut tx = Transaction::new(sender.into(), recipient.into(), amount, nonce, 1);
        tx.signature = "test-signature".into();
        tx
    }

    #[test]
    fn genesis_chains_are_identical() {
        let a = Ledger::new(4);
        let b = Ledger::new(4);
        assert_eq!(a.tip().hash, b.tip().hash);
        assert_eq!(a.height(), 1);
    }

    #[test]
    fn add_transaction_is_idempotent() {
        let mut ledger = Ledger::new(0);
        let tx = signed_tx("alice", "bob", 10, 0);
        assert!(ledger.add_transaction(tx.clone()).unwrap());
        assert!(!ledger.add_transaction(tx).unwrap());
        assert_eq!(ledger.mempool().len(), 1);
    }

    #[test]
    fn unsigned_transaction_is_rejected() {
        let mut ledger = Ledger::new(0);
        let tx = Transaction::new("alice".into(), "bob".into(), 10, 0, 1);
        assert!(ledger.add_transaction(tx).is_err());
    }

    #[test]
    fn mine_appends_a_block_and_drains_mempool() {
        let mut ledger = Ledger::new(0);
        ledger.add_transaction(signed_tx("alice", "bob", 10, 0)).unwrap();

        let cancel = AtomicBool::new(false);
        let mined = ledger.mine("miner", &cancel).unwrap();

        assert!(mined.is_some());
        assert_eq!(ledger.height(), 2);
        assert!(ledger.mempool().is_empty());
    }

    #[test]
    fn mine_with_empty_mempool_returns_none() {
        let mut ledger = Ledger::new(0);
        let cancel = AtomicBool::new(false);
        assert!(ledger.mine("miner", &cancel).unwrap().is_none());
    }

    #[test]
    fn tampered_mined_block_fails_integrity() {
        let mut ledger = Ledger::new(0);
        ledger.add_transaction(signed_tx("alice", "bob", 10, 0)).unwrap();
        let cancel = AtomicBool::new(false);
        let mut block = ledger.mine("miner", &cancel).unwrap().unwrap();

        block.nonce = block.nonce.wrapping_add(1);
        assert!(!block.is_valid());
    }

    #[test]
    fn orphan_block_is_pending_until_predecessor_arrives() {
        let mut a = Ledger::new(0);
        let mut b = Ledger::new(0);
        let cancel = AtomicBool::new(false);

        a.add_transaction(signed_tx("alice", "bob", 10, 0)).unwrap();
        let block1 = a.mine("miner", &cancel).unwrap().unwrap();
        a.add_transaction(signed_tx("alice", "bob", 5, 1)).unwrap();
        let block2 = a.mine("miner", &cancel).unwrap().unwrap();

        assert_eq!(b.add_block(block2).unwrap(), AddBlockOutcome::Pending);
        assert_eq!(b.height(), 1);
        assert_eq!(b.pending_len(), 1);

        assert_eq!(b.add_block(block1).unwrap(), AddBlockOutcome::Accepted);
        assert_eq!(b.height(), 3);
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn longer_valid_chain_replaces_shorter_one() {
        let mut local = Ledger::new(0);
        let mut remote = Ledger::new(0);
        let cancel = AtomicBool::new(false);

        for i in 0..3 {
            remote.add_transaction(signed_tx("alice", "bob", 1, i)).unwrap();
            remote.mine("miner", &cancel).unwrap();
        }

        assert!(local.replace_chain(remote.blocks().to_vec()));
        assert_eq!(local.height(), remote.height());
    }

    #[test]
    fn shorter_chain_is_rejected() {
        let mut local = Ledger::new(0);
        let cancel = AtomicBool::new(false);
        local.add_transaction(signed_tx("alice", "bob", 1, 0)).unwrap();
        local.mine("miner", &cancel).unwrap();

        let shorter = Ledger::new(0);
        assert!(!local.clone().replace_chain(shorter.blocks().to_vec()));
    }

    #[test]
    fn chain_with_different_genesis_is_rejected() {
        let mut local = Ledger::new(0);
        let mut foreign = Ledger::new(1);
        let cancel = AtomicBool::new(false);

        for i in 0..2 {
            foreign.add_transaction(signed_tx("alice", "bob", 1, i)).unwrap();
            foreign.mine("miner", &cancel).unwrap();
        }

        assert!(!local.replace_chain(foreign.blocks().to_vec()));
    }
}
