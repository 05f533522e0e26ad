//! Epoch-partitioned commitment Merkle tree
//!
//! Each epoch owns an append-only tree of depth 12 (4096 leaves) hashed
//! with width-3 Poseidon. Absent positions are padded with the zero-hash of
//! their level; the level-12 zero hash is the empty-tree root and matches
//! the on-chain constant. Roots after every insert are kept so withdrawal
//! flows can verify proofs against any historic root.
//!
//! Root recomputation is full-tree. With at most 4096 leaves per epoch this
//! stays cheap, and it keeps the client bit-for-bit aligned with the
//! program's tree.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::MerkleError;
use crate::poseidon;
use crate::{MAX_LEAVES_PER_EPOCH, MERKLE_DEPTH};

static ZERO_HASHES: OnceLock<[[u8; 32]; MERKLE_DEPTH + 1]> = OnceLock::new();

/// Zero hashes for levels 0..=12: `z[0] = 0`, `z[i] = H(z[i-1], z[i-1])`.
pub fn zero_hashes() -> &'static [[u8; 32]; MERKLE_DEPTH + 1] {
    ZERO_HASHES.get_or_init(|| {
        let mut table = [[0u8; 32]; MERKLE_DEPTH + 1];
        for level in 1..=MERKLE_DEPTH {
            table[level] = poseidon::hash_pair(&table[level - 1], &table[level - 1])
                .expect("width-3 poseidon parameters are bundled");
        }
        table
    })
}

/// Root of a tree with no leaves.
pub fn empty_root() -> [u8; 32] {
    zero_hashes()[MERKLE_DEPTH]
}

/// Lifecycle of an epoch's tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochState {
    /// Accepting inserts.
    Active,
    /// Epoch rolled over; no further inserts, final root pending.
    Frozen,
    /// Final root recorded on-chain.
    Finalized,
}

/// Self-describing inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: [u8; 32],
    pub leaf_index: u32,
    pub epoch: u64,
    /// Sibling per level, bottom-up; always `MERKLE_DEPTH` entries.
    pub siblings: Vec<[u8; 32]>,
    pub root: [u8; 32],
}

impl MerkleProof {
    /// Walk the path bottom-up and compare against the claimed root.
    pub fn verify(&self) -> bool {
        if self.siblings.len() != MERKLE_DEPTH {
            return false;
        }

        let mut current = self.leaf;
        for (level, sibling) in self.siblings.iter().enumerate() {
            let hashed = if (self.leaf_index >> level) & 1 == 1 {
                poseidon::hash_pair(sibling, &current)
            } else {
                poseidon::hash_pair(&current, sibling)
            };
            match hashed {
                Ok(node) => current = node,
                Err(_) => return false,
            }
        }

        current == self.root
    }
}

/// One epoch's commitment tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpochTree {
    epoch: u64,
    state: EpochState,
    leaves: BTreeMap<u32, [u8; 32]>,
    next_index: u32,
    root_history: Vec<[u8; 32]>,
    final_root: Option<[u8; 32]>,
}

impl EpochTree {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            state: EpochState::Active,
            leaves: BTreeMap::new(),
            next_index: 0,
            root_history: Vec::new(),
            final_root: None,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> EpochState {
        self.state
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    pub fn leaf(&self, index: u32) -> Option<[u8; 32]> {
        self.leaves.get(&index).copied()
    }

    /// Append a leaf; returns its index and the new root.
    pub fn insert(&mut self, leaf: [u8; 32]) -> Result<(u32, [u8; 32]), MerkleError> {
        self.check_insertable(1)?;

        let index = self.next_index;
        self.leaves.insert(index, leaf);
        self.next_index += 1;

        let root = self.compute_root()?;
        self.root_history.push(root);
        Ok((index, root))
    }

    /// Append many leaves, recomputing the root once.
    pub fn insert_many(&mut self, leaves: &[[u8; 32]]) -> Result<(Vec<u32>, [u8; 32]), MerkleError> {
        self.check_insertable(leaves.len())?;

        let mut indices = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let index = self.next_index;
            self.leaves.insert(index, *leaf);
            self.next_index += 1;
            indices.push(index);
        }

        let root = self.compute_root()?;
        self.root_history.push(root);
        Ok((indices, root))
    }

    fn check_insertable(&self, count: usize) -> Result<(), MerkleError> {
        if self.state != EpochState::Active {
            return Err(MerkleError::EpochNotActive { epoch: self.epoch });
        }
        if self.next_index as usize + count > MAX_LEAVES_PER_EPOCH {
            return Err(MerkleError::TreeFull {
                epoch: self.epoch,
                max: MAX_LEAVES_PER_EPOCH,
            });
        }
        Ok(())
    }

    /// Current root: the final root if recorded, else the latest history
    /// entry, else the empty-tree root.
    pub fn root(&self) -> [u8; 32] {
        self.final_root
            .or_else(|| self.root_history.last().copied())
            .unwrap_or_else(empty_root)
    }

    /// Whether `root` is the final root or appeared after any insert.
    pub fn is_known_root(&self, root: &[u8; 32]) -> bool {
        self.final_root.as_ref() == Some(root) || self.root_history.contains(root)
    }

    pub fn root_history(&self) -> &[[u8; 32]] {
        &self.root_history
    }

    /// Stop accepting inserts (epoch rolled over).
    pub fn freeze(&mut self) {
        if self.state == EpochState::Active {
            self.state = EpochState::Frozen;
        }
    }

    /// Record the on-chain final root and finalize the epoch.
    pub fn set_final_root(&mut self, root: [u8; 32]) {
        self.final_root = Some(root);
        self.state = EpochState::Finalized;
    }

    /// Inclusion proof for a previously inserted leaf.
    pub fn proof(&self, leaf_index: u32) -> Result<MerkleProof, MerkleError> {
        let leaf = self
            .leaves
            .get(&leaf_index)
            .copied()
            .ok_or(MerkleError::LeafNotFound(leaf_index))?;

        let zeros = zero_hashes();
        let levels = self.level_nodes()?;

        let mut siblings = Vec::with_capacity(MERKLE_DEPTH);
        for level in 0..MERKLE_DEPTH {
            let index = (leaf_index as usize) >> level;
            let sibling_index = index ^ 1;
            let sibling = levels[level]
                .get(sibling_index)
                .copied()
                .unwrap_or(zeros[level]);
            siblings.push(sibling);
        }

        Ok(MerkleProof {
            leaf,
            leaf_index,
            epoch: self.epoch,
            siblings,
            root: levels[MERKLE_DEPTH][0],
        })
    }

    fn compute_root(&self) -> Result<[u8; 32], MerkleError> {
        if self.next_index == 0 {
            return Ok(empty_root());
        }
        let levels = self.level_nodes()?;
        Ok(levels[MERKLE_DEPTH][0])
    }

    /// Reconstruct every level of the occupied part of the tree, padding
    /// missing right siblings with the zero hash of that level.
    fn level_nodes(&self) -> Result<Vec<Vec<[u8; 32]>>, MerkleError> {
        let zeros = zero_hashes();
        let width = self.next_index as usize;

        let mut levels: Vec<Vec<[u8; 32]>> = Vec::with_capacity(MERKLE_DEPTH + 1);
        let mut current: Vec<[u8; 32]> = (0..width as u32)
            .map(|i| self.leaves.get(&i).copied().unwrap_or(zeros[0]))
            .collect();
        levels.push(current.clone());

        for level in 0..MERKLE_DEPTH {
            let mut next = Vec::with_capacity(current.len().div_ceil(2).max(1));
            for pair in current.chunks(2) {
                let left = pair[0];
                let right = if pair.len() == 2 { pair[1] } else { zeros[level] };
                next.push(poseidon::hash_pair(&left, &right)?);
            }
            if next.is_empty() {
                next.push(zeros[level + 1]);
            }
            levels.push(next.clone());
            current = next;
        }

        Ok(levels)
    }
}
