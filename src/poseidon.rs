//! BN254 Poseidon hashing
//!
//! Thin facade over the circom-parameterized Poseidon permutation used by
//! the on-chain Groth16 verifier. Supports 1..=4 inputs (permutation widths
//! 2..=5). Inputs are 32-byte big-endian integers reduced modulo the BN254
//! scalar field before absorption; the output is the 32-byte big-endian
//! encoding of the first state element, left-padded with zeros.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::error::PoseidonError;

/// Size of a serialized BN254 field element.
pub const FIELD_SIZE: usize = 32;

/// Maximum number of inputs per hash (permutation width 5).
pub const MAX_INPUTS: usize = 4;

/// Hash 1..=4 field elements.
pub fn hash(inputs: &[[u8; FIELD_SIZE]]) -> Result<[u8; FIELD_SIZE], PoseidonError> {
    if inputs.is_empty() || inputs.len() > MAX_INPUTS {
        return Err(PoseidonError::UnsupportedArity(inputs.len()));
    }

    let elements: Vec<Fr> = inputs
        .iter()
        .map(|bytes| Fr::from_be_bytes_mod_order(bytes))
        .collect();

    let mut hasher = Poseidon::<Fr>::new_circom(elements.len())
        .map_err(|_| PoseidonError::ParametersUnavailable(elements.len() + 1))?;
    let digest = hasher
        .hash(&elements)
        .map_err(|_| PoseidonError::UnsupportedArity(elements.len()))?;

    Ok(to_bytes_be(digest))
}

/// Hash an ordered pair of tree nodes (width-3 permutation).
pub fn hash_pair(
    left: &[u8; FIELD_SIZE],
    right: &[u8; FIELD_SIZE],
) -> Result<[u8; FIELD_SIZE], PoseidonError> {
    hash(&[*left, *right])
}

fn to_bytes_be(element: Fr) -> [u8; FIELD_SIZE] {
    let repr = element.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_SIZE];
    out[FIELD_SIZE - repr.len()..].copy_from_slice(&repr);
    out
}
