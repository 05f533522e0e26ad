//! Prover capability
//!
//! The SDK never links a proving backend directly. Transaction flows hand a
//! typed witness record to a [`Prover`] implementation and receive a
//! Groth16 proof plus its public signals back. [`UnlinkedProver`] is the
//! default stand-in and fails every call with `FrameworkNotIntegrated`;
//! [`MockProver`] returns a zero proof of the correct shape so hosts and
//! tests can exercise the full pipeline without circuit artifacts.

use crate::epoch_tree::MerkleProof;
use crate::error::ProverError;
use crate::keys::SpendingKeys;
use crate::note::Note;
use crate::GROTH16_PROOF_SIZE;

/// A Groth16 proof over BN254: A (G1), B (G2), C (G1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Groth16Proof {
    pub a: [u8; 64],
    pub b: [u8; 128],
    pub c: [u8; 64],
}

impl Groth16Proof {
    /// All-zero proof of the correct shape.
    pub fn zero() -> Self {
        Self {
            a: [0u8; 64],
            b: [0u8; 128],
            c: [0u8; 64],
        }
    }

    /// `A || B || C`, 256 bytes.
    pub fn to_bytes(&self) -> [u8; GROTH16_PROOF_SIZE] {
        let mut out = [0u8; GROTH16_PROOF_SIZE];
        out[..64].copy_from_slice(&self.a);
        out[64..192].copy_from_slice(&self.b);
        out[192..].copy_from_slice(&self.c);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != GROTH16_PROOF_SIZE {
            return None;
        }
        Some(Self {
            a: bytes[..64].try_into().expect("length checked"),
            b: bytes[64..192].try_into().expect("length checked"),
            c: bytes[192..].try_into().expect("length checked"),
        })
    }
}

/// Proof plus the public signals the circuit exposed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofBundle {
    pub proof: Groth16Proof,
    pub public_inputs: Vec<[u8; 32]>,
}

/// Inputs for a withdraw proof.
#[derive(Clone, Debug)]
pub struct WithdrawWitness {
    pub note: Note,
    pub keys: SpendingKeys,
    pub merkle_proof: MerkleProof,
    pub merkle_root: [u8; 32],
    pub recipient: [u8; 32],
    pub amount: u64,
    pub epoch: u64,
    pub leaf_index: u32,
}

/// One side of a 2-in transfer.
#[derive(Clone, Debug)]
pub struct TransferInputWitness {
    pub note: Note,
    pub merkle_proof: MerkleProof,
    pub epoch: u64,
    pub leaf_index: u32,
    /// Value-0 padding input; the circuit skips its inclusion path.
    pub dummy: bool,
}

/// Inputs for a 2-in/2-out transfer proof.
#[derive(Clone, Debug)]
pub struct TransferWitness {
    pub inputs: Vec<TransferInputWitness>,
    pub keys: SpendingKeys,
    /// Recipient output followed by the change output.
    pub outputs: Vec<Note>,
    pub output_epoch: u64,
    pub fee: u64,
}

/// Inputs for a renewal proof.
#[derive(Clone, Debug)]
pub struct RenewWitness {
    pub note: Note,
    pub keys: SpendingKeys,
    pub merkle_proof: MerkleProof,
    pub merkle_root: [u8; 32],
    pub new_note: Note,
    pub source_epoch: u64,
    pub source_leaf_index: u32,
    pub target_epoch: u64,
}

/// External proving backend.
pub trait Prover {
    fn prove_withdraw(&self, witness: &WithdrawWitness) -> Result<ProofBundle, ProverError>;
    fn prove_transfer(&self, witness: &TransferWitness) -> Result<ProofBundle, ProverError>;
    fn prove_renew(&self, witness: &RenewWitness) -> Result<ProofBundle, ProverError>;
}

/// Placeholder used until a real backend is linked.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlinkedProver;

impl Prover for UnlinkedProver {
    fn prove_withdraw(&self, _witness: &WithdrawWitness) -> Result<ProofBundle, ProverError> {
        Err(ProverError::FrameworkNotIntegrated)
    }

    fn prove_transfer(&self, _witness: &TransferWitness) -> Result<ProofBundle, ProverError> {
        Err(ProverError::FrameworkNotIntegrated)
    }

    fn prove_renew(&self, _witness: &RenewWitness) -> Result<ProofBundle, ProverError> {
        Err(ProverError::FrameworkNotIntegrated)
    }
}

/// Zero-proof backend for tests and dry runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockProver;

impl MockProver {
    fn bundle() -> ProofBundle {
        ProofBundle {
            proof: Groth16Proof::zero(),
            public_inputs: Vec::new(),
        }
    }
}

impl Prover for MockProver {
    fn prove_withdraw(&self, _witness: &WithdrawWitness) -> Result<ProofBundle, ProverError> {
        Ok(Self::bundle())
    }

    fn prove_transfer(&self, _witness: &TransferWitness) -> Result<ProofBundle, ProverError> {
        Ok(Self::bundle())
    }

    fn prove_renew(&self, _witness: &RenewWitness) -> Result<ProofBundle, ProverError> {
        Ok(Self::bundle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epoch_tree::EpochTree;

    fn withdraw_witness() -> WithdrawWitness {
        let keys = SpendingKeys::from_seed([1u8; 32]);
        let mut tree = EpochTree::new(0);
        let note = Note::new(10, [0; 32], keys.shielded_address, [2; 32], None).unwrap();
        tree.insert(note.commitment).unwrap();
        let merkle_proof = tree.proof(0).unwrap();
        let merkle_root = merkle_proof.root;

        WithdrawWitness {
            note,
            keys,
            merkle_proof,
            merkle_root,
            recipient: [3; 32],
            amount: 10,
            epoch: 0,
            leaf_index: 0,
        }
    }

    #[test]
    fn test_proof_byte_layout() {
        let proof = Groth16Proof {
            a: [1u8; 64],
            b: [2u8; 128],
            c: [3u8; 64],
        };
        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), GROTH16_PROOF_SIZE);
        assert!(bytes[..64].iter().all(|&b| b == 1));
        assert!(bytes[64..192].iter().all(|&b| b == 2));
        assert!(bytes[192..].iter().all(|&b| b == 3));

        assert_eq!(Groth16Proof::from_bytes(&bytes), Some(proof));
        assert_eq!(Groth16Proof::from_bytes(&bytes[..100]), None);
    }

    #[test]
    fn test_unlinked_prover_fails() {
        let witness = withdraw_witness();
        assert_eq!(
            UnlinkedProver.prove_withdraw(&witness),
            Err(ProverError::FrameworkNotIntegrated)
        );
    }

    #[test]
    fn test_mock_prover_shape() {
        let witness = withdraw_witness();
        let bundle = MockProver.prove_withdraw(&witness).unwrap();
        assert_eq!(bundle.proof, Groth16Proof::zero());
        assert!(bundle.public_inputs.is_empty());
    }
}
