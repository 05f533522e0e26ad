//! Transaction preparation
//!
//! Builders for the four user-facing flows: deposit (no proof), withdraw,
//! transfer (2-in/2-out) and renew. Each produces a typed "prepared" record
//! carrying exactly the binary fields the instruction encoder splices into
//! an on-chain call.
//!
//! Builders never touch the note store; confirmed state only changes when
//! the scanner observes the resulting events. The prover call is the only
//! long operation and happens after every local check has passed.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commitment::note_nullifier;
use crate::epoch_tree::{empty_root, zero_hashes, EpochTree, MerkleProof};
use crate::error::{CryptoError, TxBuilderError};
use crate::keys::SpendingKeys;
use crate::note::{seal_note, Note};
use crate::prover::{
    Prover, RenewWitness, TransferInputWitness, TransferWitness, WithdrawWitness,
};
use crate::MERKLE_DEPTH;

/// Transfers are fixed at two inputs; missing ones are padded with dummies.
pub const TRANSFER_INPUTS: usize = 2;

/// A deposit, ready for the instruction encoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedDeposit {
    pub commitment: [u8; 32],
    pub amount: u64,
    /// `nonce (12) || ciphertext || tag (16)` under the recipient's viewing key.
    pub encrypted_note: Vec<u8>,
    pub epoch: u64,
    pub output_note: Note,
}

/// A withdrawal with its proof payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedWithdraw {
    /// `A || B || C`, 256 bytes.
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<[u8; 32]>,
    pub nullifier: [u8; 32],
    pub amount: u64,
    pub epoch: u64,
    pub leaf_index: u32,
    pub recipient: [u8; 32],
}

/// A 2-in/2-out shielded transfer with its proof payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedTransfer {
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<[u8; 32]>,
    pub nullifiers: [[u8; 32]; 2],
    pub input_epochs: [u64; 2],
    pub input_leaf_indices: [u32; 2],
    /// Recipient commitment followed by the change commitment.
    pub output_commitments: [[u8; 32]; 2],
    /// Sealed outputs in the same order as the commitments.
    pub encrypted_notes: Vec<Vec<u8>>,
    pub output_epoch: u64,
    pub fee: u64,
    /// Recipient note followed by the change note.
    pub output_notes: [Note; 2],
}

/// A renewal moving a note into the current epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedRenew {
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<[u8; 32]>,
    pub old_nullifier: [u8; 32],
    pub new_commitment: [u8; 32],
    pub encrypted_note: Vec<u8>,
    pub source_epoch: u64,
    pub source_leaf_index: u32,
    pub target_epoch: u64,
    pub new_note: Note,
}

/// One input to a transfer.
///
/// The dummy variant keeps the circuit shape fixed at two inputs without a
/// magic zero value in the API; it expands to a value-0 note with an
/// empty-tree inclusion path.
#[derive(Clone, Debug)]
pub enum TransferInput {
    Note { note: Note, proof: MerkleProof },
    Dummy,
}

/// Prepares pool transactions for one wallet.
pub struct TransactionBuilder<'a, P: Prover> {
    prover: &'a P,
    keys: &'a SpendingKeys,
    token: [u8; 32],
    pool_id: [u8; 32],
}

impl<'a, P: Prover> TransactionBuilder<'a, P> {
    pub fn new(prover: &'a P, keys: &'a SpendingKeys, token: [u8; 32], pool_id: [u8; 32]) -> Self {
        Self {
            prover,
            keys,
            token,
            pool_id,
        }
    }

    pub fn pool_id(&self) -> &[u8; 32] {
        &self.pool_id
    }

    /// Pair selected notes with inclusion proofs from a tree registry.
    pub fn resolve_inputs(
        notes: Vec<Note>,
        trees: &BTreeMap<u64, EpochTree>,
    ) -> Result<Vec<TransferInput>, TxBuilderError> {
        notes
            .into_iter()
            .map(|note| {
                let (epoch, leaf_index) = confirmed_position(&note)?;
                let tree = trees
                    .get(&epoch)
                    .ok_or(TxBuilderError::EpochTreeNotFound(epoch))?;
                let proof = tree.proof(leaf_index)?;
                Ok(TransferInput::Note { note, proof })
            })
            .collect()
    }

    /// Deposit: value moves transparently into the vault, so no proof is
    /// needed; the commitment and sealed note are all the program wants.
    pub fn prepare_deposit<R: RngCore>(
        &self,
        value: u64,
        recipient: [u8; 32],
        recipient_viewing_key: &[u8; 32],
        epoch: u64,
        memo: Option<String>,
        rng: &mut R,
    ) -> Result<PreparedDeposit, TxBuilderError> {
        let mut randomness = [0u8; 32];
        rng.fill_bytes(&mut randomness);
        let note = Note::new(value, self.token, recipient, randomness, memo)?;
        let encrypted_note = seal_note(&note, recipient_viewing_key, rng)?;

        Ok(PreparedDeposit {
            commitment: note.commitment,
            amount: value,
            encrypted_note,
            epoch,
            output_note: note,
        })
    }

    /// Withdraw a whole note to a transparent recipient.
    pub fn prepare_withdraw(
        &self,
        note: &Note,
        tree: &EpochTree,
        recipient: [u8; 32],
    ) -> Result<PreparedWithdraw, TxBuilderError> {
        let (epoch, leaf_index) = confirmed_position(note)?;
        if epoch != tree.epoch() {
            return Err(TxBuilderError::EpochMismatch {
                note: epoch,
                tree: tree.epoch(),
            });
        }

        let merkle_proof = tree.proof(leaf_index)?;
        let merkle_root = merkle_proof.root;
        let nullifier =
            note_nullifier(&note.commitment, &self.keys.nullifier_key, epoch, leaf_index)
                .map_err(CryptoError::from)?;

        debug!(epoch, leaf_index, amount = note.value, "proving withdraw");
        let bundle = self.prover.prove_withdraw(&WithdrawWitness {
            note: note.clone(),
            keys: self.keys.clone(),
            merkle_proof,
            merkle_root,
            recipient,
            amount: note.value,
            epoch,
            leaf_index,
        })?;

        Ok(PreparedWithdraw {
            proof_bytes: bundle.proof.to_bytes().to_vec(),
            public_inputs: bundle.public_inputs,
            nullifier,
            amount: note.value,
            epoch,
            leaf_index,
            recipient,
        })
    }

    /// Shielded transfer: up to two inputs, recipient output plus change
    /// back to this wallet. Conservation is checked before proving.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare_transfer<R: RngCore>(
        &self,
        inputs: Vec<TransferInput>,
        amount: u64,
        fee: u64,
        recipient: [u8; 32],
        recipient_viewing_key: &[u8; 32],
        output_epoch: u64,
        rng: &mut R,
    ) -> Result<PreparedTransfer, TxBuilderError> {
        if inputs.len() > TRANSFER_INPUTS {
            return Err(TxBuilderError::TooManyInputs(inputs.len()));
        }

        let mut witnesses = Vec::with_capacity(TRANSFER_INPUTS);
        for input in inputs {
            witnesses.push(match input {
                TransferInput::Note { note, proof } => {
                    let (epoch, leaf_index) = confirmed_position(&note)?;
                    if proof.epoch != epoch {
                        return Err(TxBuilderError::EpochMismatch {
                            note: epoch,
                            tree: proof.epoch,
                        });
                    }
                    TransferInputWitness {
                        note,
                        merkle_proof: proof,
                        epoch,
                        leaf_index,
                        dummy: false,
                    }
                }
                TransferInput::Dummy => self.dummy_input(output_epoch, rng)?,
            });
        }
        while witnesses.len() < TRANSFER_INPUTS {
            witnesses.push(self.dummy_input(output_epoch, rng)?);
        }

        let input_values: Vec<u64> = witnesses.iter().map(|w| w.note.value).collect();
        let total_in: u64 = input_values.iter().sum();
        let change = total_in
            .checked_sub(amount)
            .and_then(|rest| rest.checked_sub(fee))
            .ok_or(TxBuilderError::ConservationViolation {
                inputs: total_in,
                outputs: amount.saturating_add(fee),
            })?;
        validate_conservation(&input_values, &[amount, change], fee)?;

        let output_note = Note::generate(amount, self.token, recipient, rng)?;
        let change_note =
            Note::generate(change, self.token, self.keys.shielded_address, rng)?;

        let sealed_output = seal_note(&output_note, recipient_viewing_key, rng)?;
        let sealed_change = seal_note(&change_note, &self.keys.viewing_key, rng)?;

        let mut nullifiers = [[0u8; 32]; 2];
        let mut input_epochs = [0u64; 2];
        let mut input_leaf_indices = [0u32; 2];
        for (slot, witness) in witnesses.iter().enumerate() {
            nullifiers[slot] = note_nullifier(
                &witness.note.commitment,
                &self.keys.nullifier_key,
                witness.epoch,
                witness.leaf_index,
            )
            .map_err(CryptoError::from)?;
            input_epochs[slot] = witness.epoch;
            input_leaf_indices[slot] = witness.leaf_index;
        }

        debug!(amount, fee, output_epoch, "proving transfer");
        let bundle = self.prover.prove_transfer(&TransferWitness {
            inputs: witnesses,
            keys: self.keys.clone(),
            outputs: vec![output_note.clone(), change_note.clone()],
            output_epoch,
            fee,
        })?;

        Ok(PreparedTransfer {
            proof_bytes: bundle.proof.to_bytes().to_vec(),
            public_inputs: bundle.public_inputs,
            nullifiers,
            input_epochs,
            input_leaf_indices,
            output_commitments: [output_note.commitment, change_note.commitment],
            encrypted_notes: vec![sealed_output, sealed_change],
            output_epoch,
            fee,
            output_notes: [output_note, change_note],
        })
    }

    /// Renew an expiring note into `target_epoch` without disclosing it.
    pub fn prepare_renew<R: RngCore>(
        &self,
        note: &Note,
        old_tree: &EpochTree,
        target_epoch: u64,
        rng: &mut R,
    ) -> Result<PreparedRenew, TxBuilderError> {
        let (source_epoch, source_leaf_index) = confirmed_position(note)?;
        if source_epoch != old_tree.epoch() {
            return Err(TxBuilderError::EpochMismatch {
                note: source_epoch,
                tree: old_tree.epoch(),
            });
        }
        if source_epoch >= target_epoch {
            return Err(TxBuilderError::RenewNotNeeded);
        }

        let merkle_proof = old_tree.proof(source_leaf_index)?;
        let merkle_root = merkle_proof.root;
        let old_nullifier = note_nullifier(
            &note.commitment,
            &self.keys.nullifier_key,
            source_epoch,
            source_leaf_index,
        )
        .map_err(CryptoError::from)?;

        let new_note = Note::generate(note.value, note.token, note.owner, rng)?;
        let encrypted_note = seal_note(&new_note, &self.keys.viewing_key, rng)?;

        debug!(source_epoch, target_epoch, "proving renewal");
        let bundle = self.prover.prove_renew(&RenewWitness {
            note: note.clone(),
            keys: self.keys.clone(),
            merkle_proof,
            merkle_root,
            new_note: new_note.clone(),
            source_epoch,
            source_leaf_index,
            target_epoch,
        })?;

        Ok(PreparedRenew {
            proof_bytes: bundle.proof.to_bytes().to_vec(),
            public_inputs: bundle.public_inputs,
            old_nullifier,
            new_commitment: new_note.commitment,
            encrypted_note,
            source_epoch,
            source_leaf_index,
            target_epoch,
            new_note,
        })
    }

    fn dummy_input<R: RngCore>(
        &self,
        epoch: u64,
        rng: &mut R,
    ) -> Result<TransferInputWitness, TxBuilderError> {
        let note = Note::generate(0, self.token, self.keys.shielded_address, rng)?;
        let merkle_proof = MerkleProof {
            leaf: note.commitment,
            leaf_index: 0,
            epoch,
            siblings: zero_hashes()[..MERKLE_DEPTH].to_vec(),
            root: empty_root(),
        };

        Ok(TransferInputWitness {
            note,
            merkle_proof,
            epoch,
            leaf_index: 0,
            dummy: true,
        })
    }
}

/// Check `sum(inputs) == sum(outputs) + fee`.
pub fn validate_conservation(
    inputs: &[u64],
    outputs: &[u64],
    fee: u64,
) -> Result<(), TxBuilderError> {
    let total_in: u128 = inputs.iter().map(|v| *v as u128).sum();
    let total_out: u128 = outputs.iter().map(|v| *v as u128).sum::<u128>() + fee as u128;

    if total_in != total_out {
        return Err(TxBuilderError::ConservationViolation {
            inputs: total_in.min(u64::MAX as u128) as u64,
            outputs: total_out.min(u64::MAX as u128) as u64,
        });
    }
    Ok(())
}

fn confirmed_position(note: &Note) -> Result<(u64, u32), TxBuilderError> {
    match (note.epoch, note.leaf_index) {
        (Some(epoch), Some(leaf_index)) => Ok((epoch, leaf_index)),
        _ => Err(TxBuilderError::NoteNotConfirmed),
    }
}
