//! Commitment and nullifier derivation
//!
//! `commitment = H(value_be32, owner, randomness)` and
//! `nullifier = H(commitment, nullifier_key, epoch_le32, leaf_index_le32)`.
//!
//! The endianness split is dictated by the circuit: note values embed
//! big-endian, epoch and leaf index embed little-endian. Do not normalize.

use crate::error::PoseidonError;
use crate::poseidon;

/// Commitment binding a note's value, owner and blinding randomness.
pub fn note_commitment(
    value: u64,
    owner: &[u8; 32],
    randomness: &[u8; 32],
) -> Result<[u8; 32], PoseidonError> {
    poseidon::hash(&[u64_to_bytes32_be(value), *owner, *randomness])
}

/// Nullifier published when a note is spent.
pub fn note_nullifier(
    commitment: &[u8; 32],
    nullifier_key: &[u8; 32],
    epoch: u64,
    leaf_index: u32,
) -> Result<[u8; 32], PoseidonError> {
    poseidon::hash(&[
        *commitment,
        *nullifier_key,
        u64_to_bytes32_le(epoch),
        u32_to_bytes32_le(leaf_index),
    ])
}

/// u64 as a 32-byte big-endian field element.
pub fn u64_to_bytes32_be(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

/// u64 as 32 bytes, little-endian, zero-padded on the right.
pub fn u64_to_bytes32_le(value: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..8].copy_from_slice(&value.to_le_bytes());
    out
}

/// u32 as 32 bytes, little-endian, zero-padded on the right.
pub fn u32_to_bytes32_le(value: u32) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[..4].copy_from_slice(&value.to_le_bytes());
    out
}
