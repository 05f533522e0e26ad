//! Error types for the shielded pool SDK

use thiserror::Error;

/// Errors from the Poseidon hashing facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoseidonError {
    #[error("poseidon arity {0} is not supported (expected 1..=4 inputs)")]
    UnsupportedArity(usize),

    #[error("poseidon parameter table missing for width {0}")]
    ParametersUnavailable(usize),
}

/// Errors from the little-endian wire codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated input: needed {needed} bytes at offset {offset}")]
    TruncatedInput { offset: usize, needed: usize },

    #[error("length-prefixed string is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors from note serialization, sealing and address handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("serialized note has invalid length {0}")]
    InvalidNoteLength(usize),

    #[error("serialized note value exceeds 64 bits")]
    InvalidNoteValue,

    #[error("memo of {0} bytes exceeds the 65535-byte limit")]
    MemoTooLong(usize),

    #[error("authenticated decryption failed")]
    DecryptionFailed,

    #[error("note encryption failed")]
    EncryptionFailed,

    #[error("invalid shielded address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors from the epoch Merkle tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("epoch {epoch} tree is not active")]
    EpochNotActive { epoch: u64 },

    #[error("epoch {epoch} tree is full ({max} leaves)")]
    TreeFull { epoch: u64, max: usize },

    #[error("no leaf at index {0}")]
    LeafNotFound(u32),

    #[error("merkle proof does not reproduce its root")]
    ProofMismatch,

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),
}

/// Errors from the note store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NoteStoreError {
    #[error("minimum note count must be at least 1")]
    InvalidMinNotes,

    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    #[error("insufficient notes: have {have}, need {need}")]
    InsufficientNotes { have: usize, need: usize },

    #[error("note not found")]
    NoteNotFound,

    #[error(transparent)]
    Poseidon(#[from] PoseidonError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Errors from the external prover capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    #[error("invalid prover inputs: {0}")]
    InvalidInputs(String),

    #[error("witness generation failed: {0}")]
    WitnessGenerationFailed(String),

    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("no proving backend is linked into this build")]
    FrameworkNotIntegrated,
}

/// Errors from transaction preparation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxBuilderError {
    #[error("note has no confirmed leaf index or epoch")]
    NoteNotConfirmed,

    #[error("note epoch {note} does not match tree epoch {tree}")]
    EpochMismatch { note: u64, tree: u64 },

    #[error("no tree available for epoch {0}")]
    EpochTreeNotFound(u64),

    #[error("too many transfer inputs: {0} (maximum 2)")]
    TooManyInputs(usize),

    #[error("note already lives in the target epoch; renewal not needed")]
    RenewNotNeeded,

    #[error("value conservation violated: inputs {inputs}, outputs {outputs}")]
    ConservationViolation { inputs: u64, outputs: u64 },

    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(#[from] ProverError),

    #[error("instruction serialization failed")]
    Serialization,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Merkle(#[from] MerkleError),
}

/// Errors internal to the event scanner.
///
/// The scanner swallows these by design: decryption failure means the event
/// belongs to another user, and malformed events are skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScannerError {
    #[error("event payload does not parse")]
    InvalidEventData,

    #[error("note ciphertext is too short to carry a nonce")]
    CiphertextTooShort,

    #[error("note decryption failed")]
    DecryptionFailed,

    #[error("decrypted note does not match the event commitment")]
    CommitmentMismatch,

    #[error("decrypted note carries an unexpected token mint")]
    TokenMismatch,
}
