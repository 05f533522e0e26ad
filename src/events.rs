//! Pool event parsing
//!
//! Events surface in program logs as raw byte records headed by a fixed
//! 8-byte discriminator. All integers are little-endian and length prefixes
//! are u32. Unknown discriminators and truncated payloads are skipped, not
//! errors: log streams carry records from other programs too.
//!
//! Leaf indices are written as u64 on the wire even though they fit in u32;
//! readers truncate.

use serde::{Deserialize, Serialize};

use crate::codec::{Decoder, Encoder};
use crate::error::CodecError;

pub const DEPOSIT_EVENT_DISCRIMINATOR: [u8; 8] = [0xa4, 0xd6, 0x2a, 0x2f, 0x25, 0xf5, 0x58, 0x6a];
pub const WITHDRAW_EVENT_DISCRIMINATOR: [u8; 8] = [0xe7, 0xe7, 0x67, 0x4f, 0xbb, 0x93, 0x72, 0xb4];
pub const TRANSFER_EVENT_DISCRIMINATOR: [u8; 8] = [0x5c, 0x93, 0xfe, 0x4c, 0x44, 0xc9, 0xa0, 0x80];
pub const RENEW_EVENT_DISCRIMINATOR: [u8; 8] = [0x97, 0x7e, 0x4e, 0x25, 0x5c, 0x7d, 0x9e, 0xa7];
pub const EPOCH_ROLLOVER_EVENT_DISCRIMINATOR: [u8; 8] =
    [0x12, 0xb3, 0x4a, 0x7f, 0x81, 0x5c, 0x2e, 0x9f];
pub const EPOCH_FINALIZED_EVENT_DISCRIMINATOR: [u8; 8] =
    [0x3f, 0xa9, 0x8c, 0x12, 0x67, 0x4b, 0xd1, 0xe3];

/// A new commitment entered the pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub epoch: u64,
    pub pool: [u8; 32],
    pub commitment: [u8; 32],
    pub leaf_index: u32,
    pub new_root: [u8; 32],
    pub encrypted_note: Vec<u8>,
}

/// A note left the pool to a transparent recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawEvent {
    pub epoch: u64,
    pub pool: [u8; 32],
    pub nullifier: [u8; 32],
    pub amount: u64,
    pub recipient: [u8; 32],
}

/// A shielded 2-in/2-out transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub output_epoch: u64,
    pub pool: [u8; 32],
    pub nullifiers: Vec<[u8; 32]>,
    pub input_epochs: Vec<u64>,
    pub commitments: Vec<[u8; 32]>,
    pub leaf_indices: Vec<u32>,
    pub encrypted_notes: Vec<Vec<u8>>,
}

/// A note moved from an expiring epoch into the current one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewEvent {
    pub source_epoch: u64,
    pub target_epoch: u64,
    pub pool: [u8; 32],
    pub nullifier: [u8; 32],
    pub commitment: [u8; 32],
    pub leaf_index: u32,
    pub encrypted_note: Vec<u8>,
}

/// The pool advanced to a new epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochRolloverEvent {
    pub previous_epoch: u64,
    pub new_epoch: u64,
    pub pool: [u8; 32],
}

/// A past epoch's final Merkle root was recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochFinalizedEvent {
    pub epoch: u64,
    pub pool: [u8; 32],
    pub merkle_root: [u8; 32],
}

/// Any event the pool program emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    Deposit(DepositEvent),
    Withdraw(WithdrawEvent),
    Transfer(TransferEvent),
    Renew(RenewEvent),
    EpochRollover(EpochRolloverEvent),
    EpochFinalized(EpochFinalizedEvent),
}

impl PoolEvent {
    /// The pool this event belongs to.
    pub fn pool(&self) -> &[u8; 32] {
        match self {
            PoolEvent::Deposit(e) => &e.pool,
            PoolEvent::Withdraw(e) => &e.pool,
            PoolEvent::Transfer(e) => &e.pool,
            PoolEvent::Renew(e) => &e.pool,
            PoolEvent::EpochRollover(e) => &e.pool,
            PoolEvent::EpochFinalized(e) => &e.pool,
        }
    }

    /// Serialize to the on-wire record, discriminator included.
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        match self {
            PoolEvent::Deposit(e) => {
                enc.put_bytes(&DEPOSIT_EVENT_DISCRIMINATOR);
                enc.put_u64(e.epoch);
                enc.put_bytes(&e.pool);
                enc.put_bytes(&e.commitment);
                enc.put_u64(e.leaf_index as u64);
                enc.put_bytes(&e.new_root);
                enc.put_prefixed_bytes(&e.encrypted_note);
            }
            PoolEvent::Withdraw(e) => {
                enc.put_bytes(&WITHDRAW_EVENT_DISCRIMINATOR);
                enc.put_u64(e.epoch);
                enc.put_bytes(&e.pool);
                enc.put_bytes(&e.nullifier);
                enc.put_u64(e.amount);
                enc.put_bytes(&e.recipient);
            }
            PoolEvent::Transfer(e) => {
                enc.put_bytes(&TRANSFER_EVENT_DISCRIMINATOR);
                enc.put_u64(e.output_epoch);
                enc.put_bytes(&e.pool);
                enc.put_array_vec(&e.nullifiers);
                enc.put_u64_vec(&e.input_epochs);
                enc.put_array_vec(&e.commitments);
                let wide: Vec<u64> = e.leaf_indices.iter().map(|i| *i as u64).collect();
                enc.put_u64_vec(&wide);
                enc.put_bytes_vec(&e.encrypted_notes);
            }
            PoolEvent::Renew(e) => {
                enc.put_bytes(&RENEW_EVENT_DISCRIMINATOR);
                enc.put_u64(e.source_epoch);
                enc.put_u64(e.target_epoch);
                enc.put_bytes(&e.pool);
                enc.put_bytes(&e.nullifier);
                enc.put_bytes(&e.commitment);
                enc.put_u64(e.leaf_index as u64);
                enc.put_prefixed_bytes(&e.encrypted_note);
            }
            PoolEvent::EpochRollover(e) => {
                enc.put_bytes(&EPOCH_ROLLOVER_EVENT_DISCRIMINATOR);
                enc.put_u64(e.previous_epoch);
                enc.put_u64(e.new_epoch);
                enc.put_bytes(&e.pool);
            }
            PoolEvent::EpochFinalized(e) => {
                enc.put_bytes(&EPOCH_FINALIZED_EVENT_DISCRIMINATOR);
                enc.put_u64(e.epoch);
                enc.put_bytes(&e.pool);
                enc.put_bytes(&e.merkle_root);
            }
        }
        enc.finish()
    }
}

/// Parse one event record. `None` on unknown discriminator or truncation.
pub fn parse_event(data: &[u8]) -> Option<PoolEvent> {
    if data.len() < 8 {
        return None;
    }

    let (discriminator, payload) = data.split_at(8);
    let mut dec = Decoder::new(payload);

    let parsed = match <[u8; 8]>::try_from(discriminator).ok()? {
        DEPOSIT_EVENT_DISCRIMINATOR => parse_deposit(&mut dec).map(PoolEvent::Deposit),
        WITHDRAW_EVENT_DISCRIMINATOR => parse_withdraw(&mut dec).map(PoolEvent::Withdraw),
        TRANSFER_EVENT_DISCRIMINATOR => parse_transfer(&mut dec).map(PoolEvent::Transfer),
        RENEW_EVENT_DISCRIMINATOR => parse_renew(&mut dec).map(PoolEvent::Renew),
        EPOCH_ROLLOVER_EVENT_DISCRIMINATOR => {
            parse_rollover(&mut dec).map(PoolEvent::EpochRollover)
        }
        EPOCH_FINALIZED_EVENT_DISCRIMINATOR => {
            parse_finalized(&mut dec).map(PoolEvent::EpochFinalized)
        }
        _ => return None,
    };

    parsed.ok()
}

fn parse_deposit(dec: &mut Decoder<'_>) -> Result<DepositEvent, CodecError> {
    Ok(DepositEvent {
        epoch: dec.read_u64()?,
        pool: dec.read_array()?,
        commitment: dec.read_array()?,
        leaf_index: dec.read_u64()? as u32,
        new_root: dec.read_array()?,
        encrypted_note: dec.read_prefixed_bytes()?.to_vec(),
    })
}

fn parse_withdraw(dec: &mut Decoder<'_>) -> Result<WithdrawEvent, CodecError> {
    Ok(WithdrawEvent {
        epoch: dec.read_u64()?,
        pool: dec.read_array()?,
        nullifier: dec.read_array()?,
        amount: dec.read_u64()?,
        recipient: dec.read_array()?,
    })
}

fn parse_transfer(dec: &mut Decoder<'_>) -> Result<TransferEvent, CodecError> {
    Ok(TransferEvent {
        output_epoch: dec.read_u64()?,
        pool: dec.read_array()?,
        nullifiers: dec.read_array_vec()?,
        input_epochs: dec.read_u64_vec()?,
        commitments: dec.read_array_vec()?,
        leaf_indices: dec
            .read_u64_vec()?
            .into_iter()
            .map(|i| i as u32)
            .collect(),
        encrypted_notes: dec.read_bytes_vec()?,
    })
}

fn parse_renew(dec: &mut Decoder<'_>) -> Result<RenewEvent, CodecError> {
    Ok(RenewEvent {
        source_epoch: dec.read_u64()?,
        target_epoch: dec.read_u64()?,
        pool: dec.read_array()?,
        nullifier: dec.read_array()?,
        commitment: dec.read_array()?,
        leaf_index: dec.read_u64()? as u32,
        encrypted_note: dec.read_prefixed_bytes()?.to_vec(),
    })
}

fn parse_rollover(dec: &mut Decoder<'_>) -> Result<EpochRolloverEvent, CodecError> {
    Ok(EpochRolloverEvent {
        previous_epoch: dec.read_u64()?,
        new_epoch: dec.read_u64()?,
        pool: dec.read_array()?,
    })
}

fn parse_finalized(dec: &mut Decoder<'_>) -> Result<EpochFinalizedEvent, CodecError> {
    Ok(EpochFinalizedEvent {
        epoch: dec.read_u64()?,
        pool: dec.read_array()?,
        merkle_root: dec.read_array()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_deposit() -> DepositEvent {
        DepositEvent {
            epoch: 3,
            pool: [0x10; 32],
            commitment: [0x20; 32],
            leaf_index: 42,
            new_root: [0x30; 32],
            encrypted_note: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn test_deposit_roundtrip() {
        let event = PoolEvent::Deposit(sample_deposit());
        assert_eq!(parse_event(&event.encode()), Some(event));
    }

    #[test]
    fn test_deposit_wire_layout() {
        let bytes = PoolEvent::Deposit(sample_deposit()).encode();
        assert_eq!(&bytes[..8], &DEPOSIT_EVENT_DISCRIMINATOR);
        // epoch
        assert_eq!(&bytes[8..16], &3u64.to_le_bytes());
        // leaf index is u64 on the wire
        assert_eq!(&bytes[80..88], &42u64.to_le_bytes());
        // note length prefix follows the new root
        assert_eq!(&bytes[120..124], &4u32.to_le_bytes());
        assert_eq!(bytes.len(), 128);
    }

    #[test]
    fn test_transfer_roundtrip() {
        let event = PoolEvent::Transfer(TransferEvent {
            output_epoch: 9,
            pool: [0x11; 32],
            nullifiers: vec![[1; 32], [2; 32]],
            input_epochs: vec![7, 8],
            commitments: vec![[3; 32], [4; 32]],
            leaf_indices: vec![5, 6],
            encrypted_notes: vec![vec![0xaa; 10], vec![0xbb; 20]],
        });
        assert_eq!(parse_event(&event.encode()), Some(event));
    }

    #[test]
    fn test_withdraw_renew_epoch_events_roundtrip() {
        let events = [
            PoolEvent::Withdraw(WithdrawEvent {
                epoch: 1,
                pool: [2; 32],
                nullifier: [3; 32],
                amount: 500,
                recipient: [4; 32],
            }),
            PoolEvent::Renew(RenewEvent {
                source_epoch: 1,
                target_epoch: 4,
                pool: [2; 32],
                nullifier: [5; 32],
                commitment: [6; 32],
                leaf_index: 9,
                encrypted_note: vec![7; 30],
            }),
            PoolEvent::EpochRollover(EpochRolloverEvent {
                previous_epoch: 3,
                new_epoch: 4,
                pool: [2; 32],
            }),
            PoolEvent::EpochFinalized(EpochFinalizedEvent {
                epoch: 3,
                pool: [2; 32],
                merkle_root: [8; 32],
            }),
        ];

        for event in events {
            assert_eq!(parse_event(&event.encode()), Some(event));
        }
    }

    #[test]
    fn test_unknown_discriminator_skipped() {
        let mut bytes = PoolEvent::Deposit(sample_deposit()).encode();
        bytes[0] ^= 0xff;
        assert_eq!(parse_event(&bytes), None);
    }

    #[test]
    fn test_truncated_event_skipped() {
        let bytes = PoolEvent::Deposit(sample_deposit()).encode();
        for len in [0, 4, 8, 20, bytes.len() - 1] {
            assert_eq!(parse_event(&bytes[..len]), None);
        }
    }
}
