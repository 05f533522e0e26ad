//! Shielded Pool SDK
//!
//! Client-side engine for the epoch-based shielded pool program:
//! - Key derivation and shielded addresses
//! - Note creation, sealing and discovery (viewing-key scanning)
//! - Epoch-partitioned commitment Merkle trees with inclusion proofs
//! - Transaction preparation for deposit, withdraw, transfer and renew
//! - Binary instruction encoding and program-derived addresses
//!
//! Proof generation is consumed through the [`prover::Prover`] trait; the
//! SDK ships without a proving backend and every flow that needs one fails
//! with [`error::ProverError::FrameworkNotIntegrated`] until a backend is
//! linked.

pub mod codec;
pub mod commitment;
pub mod epoch_tree;
pub mod error;
pub mod events;
pub mod fees;
pub mod instruction;
pub mod keys;
pub mod note;
pub mod note_store;
pub mod poseidon;
pub mod prover;
pub mod scanner;
pub mod transaction;

// Re-exports for convenience
pub use epoch_tree::{EpochState, EpochTree, MerkleProof};
pub use error::{
    CodecError, CryptoError, MerkleError, NoteStoreError, PoseidonError, ProverError,
    ScannerError, TxBuilderError,
};
pub use events::PoolEvent;
pub use keys::SpendingKeys;
pub use note::Note;
pub use note_store::{BalanceInfo, ExpiryConfig, NoteStore};
pub use prover::{Groth16Proof, MockProver, ProofBundle, Prover, UnlinkedProver};
pub use scanner::Scanner;
pub use transaction::{
    PreparedDeposit, PreparedRenew, PreparedTransfer, PreparedWithdraw, TransactionBuilder,
    TransferInput,
};

/// Depth of each epoch's commitment Merkle tree.
pub const MERKLE_DEPTH: usize = 12;

/// Maximum leaves per epoch tree (2^12).
pub const MAX_LEAVES_PER_EPOCH: usize = 1 << MERKLE_DEPTH;

/// Leaves stored per on-chain leaf-chunk account.
pub const LEAF_CHUNK_SIZE: u32 = 256;

/// Serialized Groth16 proof size: A (64) || B (128) || C (64).
pub const GROTH16_PROOF_SIZE: usize = 256;

/// ChaCha20-Poly1305 nonce length prefixed to sealed notes.
pub const NOTE_NONCE_SIZE: usize = 12;

/// Default pool timing parameters (slots).
pub const DEFAULT_EPOCH_DURATION_SLOTS: u64 = 3_024_000;
pub const DEFAULT_EXPIRY_SLOTS: u64 = 38_880_000;
pub const DEFAULT_FINALIZATION_DELAY_SLOTS: u64 = 216_000;
