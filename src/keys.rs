//! Key derivation for the shielded pool
//!
//! All key material derives from a single 32-byte seed with domain-separated
//! SHA-256:
//! - spending key: authorizes spends inside the circuit
//! - viewing key: symmetric key that opens note ciphertexts (read-only)
//! - nullifier key: bound into every nullifier to prevent double spends
//! - shielded address: the public receiving identity, displayed Base58
//!
//! The seed never leaves this struct; collaborators only read the derived
//! sub-keys.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

const SPENDING_DOMAIN: &[u8] = b"spending";
const VIEWING_DOMAIN: &[u8] = b"viewing";
const NULLIFIER_DOMAIN: &[u8] = b"nullifier";
const ADDRESS_DOMAIN: &[u8] = b"address";

/// Full key set for one wallet.
#[derive(Clone, Serialize, Deserialize)]
pub struct SpendingKeys {
    seed: [u8; 32],
    pub spending_key: [u8; 32],
    pub viewing_key: [u8; 32],
    pub nullifier_key: [u8; 32],
    pub shielded_address: [u8; 32],
}

impl SpendingKeys {
    /// Derive the full key set from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let spending_key = derive(SPENDING_DOMAIN, &seed);
        let viewing_key = derive(VIEWING_DOMAIN, &seed);
        let nullifier_key = derive(NULLIFIER_DOMAIN, &seed);
        let shielded_address = derive(ADDRESS_DOMAIN, &spending_key);

        Self {
            seed,
            spending_key,
            viewing_key,
            nullifier_key,
            shielded_address,
        }
    }

    /// Generate a wallet from fresh OS randomness.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// The raw seed, for backup by the wallet host.
    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Base58 display form of the shielded address.
    pub fn address_base58(&self) -> String {
        encode_address(&self.shielded_address)
    }
}

impl std::fmt::Debug for SpendingKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the seed or spending key.
        f.debug_struct("SpendingKeys")
            .field("shielded_address", &self.address_base58())
            .finish_non_exhaustive()
    }
}

fn derive(domain: &[u8], input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(input);
    hasher.finalize().into()
}

/// Encode a 32-byte shielded address with the Bitcoin Base58 alphabet.
pub fn encode_address(address: &[u8; 32]) -> String {
    bs58::encode(address).into_string()
}

/// Decode a Base58 shielded address.
///
/// Rejects characters outside the alphabet, the empty string, and any input
/// that does not decode to exactly 32 bytes.
pub fn decode_address(encoded: &str) -> Result<[u8; 32], CryptoError> {
    if encoded.is_empty() {
        return Err(CryptoError::InvalidAddress("empty input".into()));
    }

    let raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CryptoError::InvalidAddress(e.to_string()))?;

    raw.as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidAddress(format!("decoded length {}", raw.len())))
}
