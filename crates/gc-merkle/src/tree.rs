use gc_hash::{hash_pair, hash_str, hash_value};
use gc_transaction::Transaction;

use crate::{
    error::MerkleError,
    proof::{MerkleProof, ProofNode, ProofSide},
};

/// A binary Merkle tree built from a slice of [`Transaction`]s.
///
/// Leaf hashes are `hash(tx_canonical_dict)` for each transaction (see
/// `gc_hash::hash_value`). Parent hashes are `hash(left_hex || right_hex)`,
/// the string concatenation of the two hex-encoded child hashes, not their
/// raw bytes. When the number of leaves is odd the last leaf is duplicated
/// so that every level is always even-width. An empty transaction list
/// commits to `hash("empty_block")` rather than failing.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// All levels of the tree, `levels[0]` = leaf hashes,
    /// `levels[last]` = single root hash.
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Build a Merkle tree from `transactions`.
    pub fn new(transactions: &[Transaction]) -> Result<Self, MerkleError> {
        if transactions.is_empty() {
            return Ok(Self {
                levels: vec![vec![hash_str("empty_block")]],
            });
        }

        let mut leaves: Vec<String> = transactions
            .iter()
            .map(|tx| hash_value(tx).map_err(|e| MerkleError::HashFailed(e.to_string())))
            .collect::<Result<_, _>>()?;

        let mut levels: Vec<Vec<String>> = vec![leaves.clone()];

        while leaves.len() > 1 {
            if leaves.len() % 2 != 0 {
                let last = leaves.last().unwrap().clone();
                leaves.push(last);
            }

            let parent_level: Vec<String> = leaves
                .chunks(2)
                .map(|chunk| hash_pair(&chunk[0], &chunk[1]))
                .collect();

            levels.push(parent_level.clone());
            leaves = parent_level;
        }

        Ok(Self { levels })
    }

    /// The Merkle root hash (hex-encoded).
    pub fn root_hash(&self) -> String {
        // Safety: `levels` always has at least one (possibly single-element)
        // level, constructed in `new`.
        self.levels.last().unwrap().last().unwrap().clone()
    }

    /// Build an inclusion proof for the given leaf hash.
    pub fn proof(&self, leaf_hash: &str) -> Result<MerkleProof, MerkleError> {
        let mut index = self.levels[0]
            .iter()
            .position(|h| h == leaf_hash)
            .ok_or(MerkleError::NotFound)?;

        let mut path = Vec::new();

        for level in &self.levels[..self.levels.len() - 1] {
            let mut padded = level.clone();
            if padded.len() % 2 != 0 {
                let last = padded.last().unwrap().clone();
                padded.push(last);
            }

            let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
            let side = if index % 2 == 0 {
                ProofSide::Right
            } else {
                ProofSide::Left
            };

            path.push(ProofNode {
                hash: padded[sibling_index].clone(),
                side,
            });

            index /= 2;
        }

        Ok(MerkleProof {
            leaf_hash: leaf_hash.to_string(),
            path,
        })
    }
}
