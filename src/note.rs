//! Shielded notes and note sealing
//!
//! A note is the pool's UTXO: a value bound to an owner and a blinding
//! nonce, represented on-chain only by its commitment. Notes travel between
//! users as ChaCha20-Poly1305 ciphertexts opened with the recipient's
//! viewing key; the 12-byte nonce is prefixed to the ciphertext.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder};
use crate::commitment::{note_commitment, note_nullifier, u64_to_bytes32_be};
use crate::error::{CodecError, CryptoError, PoseidonError};
use crate::NOTE_NONCE_SIZE;

/// Maximum memo length (u16 length prefix on the wire).
pub const MEMO_MAX_LEN: usize = u16::MAX as usize;

/// Fixed prefix of a serialized note: value (32) + token (32) + owner (32)
/// + randomness (32) + memo length (2).
const NOTE_FIXED_LEN: usize = 130;

/// A shielded note (UTXO).
///
/// Constructed pending (`leaf_index`/`epoch`/`nullifier` absent), confirmed
/// once observed on-chain, spent once its nullifier is published.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Value in atomic token units.
    pub value: u64,
    /// Token mint identity.
    pub token: [u8; 32],
    /// Recipient's shielded address.
    pub owner: [u8; 32],
    /// Blinding randomness, also the commitment binding nonce.
    pub randomness: [u8; 32],
    /// Optional UTF-8 memo.
    pub memo: Option<String>,
    /// Derived commitment (always consistent with the fields above).
    pub commitment: [u8; 32],
    /// Position in the epoch tree, set on confirmation.
    pub leaf_index: Option<u32>,
    /// Epoch the note was committed in, set on confirmation.
    pub epoch: Option<u64>,
    /// Nullifier, derivable only after confirmation.
    pub nullifier: Option<[u8; 32]>,
    /// Whether the nullifier has been observed on-chain.
    pub spent: bool,
}

impl Note {
    /// Build a pending note from explicit randomness.
    pub fn new(
        value: u64,
        token: [u8; 32],
        owner: [u8; 32],
        randomness: [u8; 32],
        memo: Option<String>,
    ) -> Result<Self, CryptoError> {
        if let Some(memo) = &memo {
            if memo.len() > MEMO_MAX_LEN {
                return Err(CryptoError::MemoTooLong(memo.len()));
            }
        }
        let commitment = note_commitment(value, &owner, &randomness)?;

        Ok(Self {
            value,
            token,
            owner,
            randomness,
            memo,
            commitment,
            leaf_index: None,
            epoch: None,
            nullifier: None,
            spent: false,
        })
    }

    /// Build a pending note with fresh blinding randomness.
    pub fn generate<R: RngCore>(
        value: u64,
        token: [u8; 32],
        owner: [u8; 32],
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        let mut randomness = [0u8; 32];
        rng.fill_bytes(&mut randomness);
        Self::new(value, token, owner, randomness, None)
    }

    /// Whether the note has an on-chain position.
    pub fn is_confirmed(&self) -> bool {
        self.leaf_index.is_some() && self.epoch.is_some()
    }

    /// Recompute and cache the nullifier from the confirmed position.
    ///
    /// Returns `false` (and leaves the note untouched) while the note is
    /// still pending.
    pub fn recompute_nullifier(&mut self, nullifier_key: &[u8; 32]) -> Result<bool, PoseidonError> {
        match (self.epoch, self.leaf_index) {
            (Some(epoch), Some(leaf_index)) => {
                self.nullifier =
                    Some(note_nullifier(&self.commitment, nullifier_key, epoch, leaf_index)?);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Binary layout: value (32, big-endian) || token || owner || randomness
    /// || memo length (u16 LE) || memo bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let memo = self.memo.as_deref().unwrap_or("");
        let mut enc = Encoder::with_capacity(NOTE_FIXED_LEN + memo.len());
        enc.put_bytes(&u64_to_bytes32_be(self.value));
        enc.put_bytes(&self.token);
        enc.put_bytes(&self.owner);
        enc.put_bytes(&self.randomness);
        enc.put_u16(memo.len() as u16);
        enc.put_bytes(memo.as_bytes());
        enc.finish()
    }

    /// Parse a serialized note and recompute its commitment.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < NOTE_FIXED_LEN {
            return Err(CryptoError::InvalidNoteLength(bytes.len()));
        }

        let mut dec = Decoder::new(bytes);
        let value_wide = dec.read_array()?;
        if value_wide[..24] != [0u8; 24] {
            return Err(CryptoError::InvalidNoteValue);
        }
        let value = u64::from_be_bytes(value_wide[24..].try_into().expect("length checked"));

        let token = dec.read_array()?;
        let owner = dec.read_array()?;
        let randomness = dec.read_array()?;

        let memo_len = dec.read_u16()? as usize;
        let memo_bytes = dec.read_bytes(memo_len)?;
        let memo = if memo_bytes.is_empty() {
            None
        } else {
            Some(
                String::from_utf8(memo_bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)?,
            )
        };

        Self::new(value, token, owner, randomness, memo)
    }
}

/// Seal a note for its recipient: `nonce (12) || ciphertext || tag (16)`.
pub fn seal_note<R: RngCore>(
    note: &Note,
    viewing_key: &[u8; 32],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        ChaCha20Poly1305::new_from_slice(viewing_key).map_err(|_| CryptoError::EncryptionFailed)?;

    let mut nonce_bytes = [0u8; NOTE_NONCE_SIZE];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from(nonce_bytes);

    let ciphertext = cipher
        .encrypt(&nonce, note.serialize().as_slice())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(NOTE_NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Try to open a sealed note with a viewing key.
///
/// `None` on any failure: the blob usually belongs to another user.
pub fn open_note(blob: &[u8], viewing_key: &[u8; 32]) -> Option<Note> {
    if blob.len() < NOTE_NONCE_SIZE {
        return None;
    }

    let cipher = ChaCha20Poly1305::new_from_slice(viewing_key).ok()?;
    let nonce_bytes: [u8; NOTE_NONCE_SIZE] = blob[..NOTE_NONCE_SIZE].try_into().ok()?;
    let nonce = Nonce::from(nonce_bytes);

    let plaintext = cipher.decrypt(&nonce, &blob[NOTE_NONCE_SIZE..]).ok()?;
    Note::deserialize(&plaintext).ok()
}
