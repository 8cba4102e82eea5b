use serde::{Deserialize, Serialize};

use gc_hash::hash_pair;

/// Indicates which side the sibling hash sits on when re-computing a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofSide {
    Left,
    Right,
}

/// A single step in a Merkle inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    pub hash: String,
    pub side: ProofSide,
}

/// An inclusion proof for a single transaction leaf.
///
/// Verify by hashing the leaf upward through each sibling until the computed
/// root matches the expected root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The hex-encoded hash of the leaf being proved.
    pub leaf_hash: String,
    /// Ordered list of sibling hashes from leaf to root.
    pub path: Vec<ProofNode>,
}

impl MerkleProof {
    /// Returns `true` if following the proof path reproduces `expected_root`.
    pub fn verify(&self, expected_root: &str) -> bool {
        let mut current = self.leaf_hash.clone();

        for node in &self.path {
            current = match node.side {
                ProofSide::Left => hash_pair(&node.hash, &current),
                ProofSide::Right => hash_pair(&current, &node.hash),
            };
        }

        current == expected_root
    }
}
