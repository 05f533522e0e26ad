//! Instruction encoding and program-derived addresses
//!
//! Every on-chain call is `discriminator (8) || borsh(args)`. The account
//! lists are fixed vectors in the order the program expects; each builder
//! documents its order. Addresses derive from UTF-8 seed labels, raw key
//! bytes and little-endian integers via `find_program_address`.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;

use crate::error::TxBuilderError;
use crate::transaction::{PreparedRenew, PreparedTransfer, PreparedWithdraw};
use crate::LEAF_CHUNK_SIZE;

/// The system program (the all-zero key).
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

pub const POOL_CONFIG_SEED: &[u8] = b"pool_config";
pub const EPOCH_TREE_SEED: &[u8] = b"epoch_tree";
pub const LEAF_CHUNK_SEED: &[u8] = b"leaves";
pub const VAULT_AUTHORITY_SEED: &[u8] = b"vault_authority";
pub const VAULT_SEED: &[u8] = b"vault";
pub const NULLIFIER_SEED: &[u8] = b"nullifier";
pub const VERIFIER_SEED: &[u8] = b"verifier";

/// Registered circuit names for the verifier-config PDA.
pub const WITHDRAW_CIRCUIT: &str = "withdraw";
pub const TRANSFER_CIRCUIT: &str = "transfer";
pub const RENEW_CIRCUIT: &str = "renew";

/// Fixed 8-byte instruction discriminators.
pub mod discriminator {
    pub const INITIALIZE_POOL_V2: [u8; 8] = [0xcf, 0x2d, 0x57, 0xf2, 0x1b, 0x3f, 0xcc, 0x43];
    pub const INITIALIZE_EPOCH_LEAF_CHUNK: [u8; 8] =
        [0x80, 0xb5, 0xe0, 0xa7, 0xbd, 0xc3, 0xa1, 0xd3];
    pub const DEPOSIT_V2: [u8; 8] = [0x6d, 0x4b, 0x45, 0x99, 0xac, 0xda, 0x92, 0x13];
    pub const WITHDRAW_V2: [u8; 8] = [0xf2, 0x50, 0xa3, 0x00, 0xc4, 0xdd, 0xc2, 0xc2];
    pub const TRANSFER_V2: [u8; 8] = [0x77, 0x28, 0x06, 0xeb, 0xea, 0xdd, 0xf8, 0x31];
    pub const RENEW_NOTE: [u8; 8] = [0xcf, 0xfe, 0x07, 0x63, 0xcc, 0x44, 0xa3, 0xab];
    pub const ROLLOVER_EPOCH: [u8; 8] = [0xb2, 0x0c, 0x6a, 0xe9, 0x7d, 0x37, 0x3a, 0x6f];
    pub const FINALIZE_EPOCH: [u8; 8] = [0x9f, 0x5d, 0x75, 0xd9, 0x3f, 0x2c, 0xf9, 0x4c];
}

// ---------------------------------------------------------------------------
// Argument records (Borsh layout is the on-chain ABI)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializePoolArgs {
    pub epoch_duration_slots: u64,
    pub expiry_slots: u64,
    pub finalization_delay_slots: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct InitializeLeafChunkArgs {
    pub epoch: u64,
    pub chunk_index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DepositArgs {
    pub commitment: [u8; 32],
    pub amount: u64,
    pub encrypted_note: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WithdrawPublicInputs {
    pub root: [u8; 32],
    pub nullifier: [u8; 32],
    pub amount: u64,
    pub recipient: [u8; 32],
    pub epoch: u64,
    pub tx_anchor: [u8; 32],
    pub pool_id: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WithdrawArgs {
    pub proof: Vec<u8>,
    pub public_inputs: WithdrawPublicInputs,
}

impl WithdrawArgs {
    pub fn from_prepared(
        prepared: &PreparedWithdraw,
        root: [u8; 32],
        tx_anchor: [u8; 32],
        pool_id: [u8; 32],
    ) -> Self {
        Self {
            proof: prepared.proof_bytes.clone(),
            public_inputs: WithdrawPublicInputs {
                root,
                nullifier: prepared.nullifier,
                amount: prepared.amount,
                recipient: prepared.recipient,
                epoch: prepared.epoch,
                tx_anchor,
                pool_id,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferPublicInputs {
    pub root: [u8; 32],
    pub nullifiers: [[u8; 32]; 2],
    pub output_commitments: [[u8; 32]; 2],
    pub output_epoch: u64,
    pub tx_anchor: [u8; 32],
    pub pool_id: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferArgs {
    pub proof: Vec<u8>,
    pub public_inputs: TransferPublicInputs,
    pub encrypted_notes: Vec<Vec<u8>>,
}

impl TransferArgs {
    pub fn from_prepared(
        prepared: &PreparedTransfer,
        root: [u8; 32],
        tx_anchor: [u8; 32],
        pool_id: [u8; 32],
    ) -> Self {
        Self {
            proof: prepared.proof_bytes.clone(),
            public_inputs: TransferPublicInputs {
                root,
                nullifiers: prepared.nullifiers,
                output_commitments: prepared.output_commitments,
                output_epoch: prepared.output_epoch,
                tx_anchor,
                pool_id,
            },
            encrypted_notes: prepared.encrypted_notes.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RenewPublicInputs {
    pub root: [u8; 32],
    pub nullifier: [u8; 32],
    pub new_commitment: [u8; 32],
    pub source_epoch: u64,
    pub target_epoch: u64,
    pub tx_anchor: [u8; 32],
    pub pool_id: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RenewArgs {
    pub proof: Vec<u8>,
    pub public_inputs: RenewPublicInputs,
    pub encrypted_note: Vec<u8>,
}

impl RenewArgs {
    pub fn from_prepared(
        prepared: &PreparedRenew,
        root: [u8; 32],
        tx_anchor: [u8; 32],
        pool_id: [u8; 32],
    ) -> Self {
        Self {
            proof: prepared.proof_bytes.clone(),
            public_inputs: RenewPublicInputs {
                root,
                nullifier: prepared.old_nullifier,
                new_commitment: prepared.new_commitment,
                source_epoch: prepared.source_epoch,
                target_epoch: prepared.target_epoch,
                tx_anchor,
                pool_id,
            },
            encrypted_note: prepared.encrypted_note.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct FinalizeEpochArgs {
    pub epoch: u64,
}

/// `discriminator || borsh(args)`.
pub fn instruction_data<T: BorshSerialize>(
    discriminator: &[u8; 8],
    args: &T,
) -> Result<Vec<u8>, TxBuilderError> {
    let mut data = discriminator.to_vec();
    let encoded = borsh::to_vec(args).map_err(|_| TxBuilderError::Serialization)?;
    data.extend_from_slice(&encoded);
    Ok(data)
}

// ---------------------------------------------------------------------------
// Program-derived addresses
// ---------------------------------------------------------------------------

pub fn pool_config_address(program_id: &Pubkey, mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POOL_CONFIG_SEED, mint.as_ref()], program_id)
}

pub fn epoch_tree_address(program_id: &Pubkey, pool_config: &Pubkey, epoch: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[EPOCH_TREE_SEED, pool_config.as_ref(), &epoch.to_le_bytes()],
        program_id,
    )
}

pub fn leaf_chunk_address(
    program_id: &Pubkey,
    pool_config: &Pubkey,
    epoch: u64,
    chunk_index: u32,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            LEAF_CHUNK_SEED,
            pool_config.as_ref(),
            &epoch.to_le_bytes(),
            &chunk_index.to_le_bytes(),
        ],
        program_id,
    )
}

pub fn vault_authority_address(program_id: &Pubkey, pool_config: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_AUTHORITY_SEED, pool_config.as_ref()], program_id)
}

pub fn vault_address(program_id: &Pubkey, pool_config: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, pool_config.as_ref()], program_id)
}

pub fn nullifier_marker_address(
    program_id: &Pubkey,
    pool_config: &Pubkey,
    nullifier: &[u8; 32],
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[NULLIFIER_SEED, pool_config.as_ref(), nullifier],
        program_id,
    )
}

pub fn verifier_config_address(
    program_id: &Pubkey,
    pool_config: &Pubkey,
    circuit_name: &str,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[VERIFIER_SEED, pool_config.as_ref(), circuit_name.as_bytes()],
        program_id,
    )
}

/// Chunk account holding a given leaf (256 leaves per chunk).
pub fn leaf_chunk_index(leaf_index: u32) -> u32 {
    leaf_index / LEAF_CHUNK_SIZE
}

// ---------------------------------------------------------------------------
// Instruction builders
// ---------------------------------------------------------------------------

/// Accounts:
/// 0. `[signer, writable]` Payer
/// 1. `[writable]` Pool config
/// 2. `[]` Vault authority
/// 3. `[writable]` Vault
/// 4. `[]` Mint
/// 5. `[]` Token program
/// 6. `[]` System program
pub fn initialize_pool(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
    args: &InitializePoolArgs,
) -> Result<Instruction, TxBuilderError> {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (vault_authority, _) = vault_authority_address(program_id, &pool_config);
    let (vault, _) = vault_address(program_id, &pool_config);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool_config, false),
            AccountMeta::new_readonly(vault_authority, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*token_program, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data(&discriminator::INITIALIZE_POOL_V2, args)?,
    })
}

/// Accounts:
/// 0. `[signer, writable]` Payer
/// 1. `[]` Pool config
/// 2. `[writable]` Leaf chunk
/// 3. `[]` System program
pub fn initialize_leaf_chunk(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    args: &InitializeLeafChunkArgs,
) -> Result<Instruction, TxBuilderError> {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (leaf_chunk, _) =
        leaf_chunk_address(program_id, &pool_config, args.epoch, args.chunk_index);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(pool_config, false),
            AccountMeta::new(leaf_chunk, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data(&discriminator::INITIALIZE_EPOCH_LEAF_CHUNK, args)?,
    })
}

/// Accounts:
/// 0. `[signer, writable]` Depositor
/// 1. `[writable]` Depositor token account
/// 2. `[writable]` Pool config
/// 3. `[writable]` Epoch tree
/// 4. `[writable]` Leaf chunk
/// 5. `[writable]` Vault
/// 6. `[]` Mint
/// 7. `[]` Token program
/// 8. `[]` System program
#[allow(clippy::too_many_arguments)]
pub fn deposit(
    program_id: &Pubkey,
    depositor: &Pubkey,
    depositor_token: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
    epoch: u64,
    chunk_index: u32,
    args: &DepositArgs,
) -> Result<Instruction, TxBuilderError> {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (epoch_tree, _) = epoch_tree_address(program_id, &pool_config, epoch);
    let (leaf_chunk, _) = leaf_chunk_address(program_id, &pool_config, epoch, chunk_index);
    let (vault, _) = vault_address(program_id, &pool_config);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*depositor, true),
            AccountMeta::new(*depositor_token, false),
            AccountMeta::new(pool_config, false),
            AccountMeta::new(epoch_tree, false),
            AccountMeta::new(leaf_chunk, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*token_program, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data(&discriminator::DEPOSIT_V2, args)?,
    })
}

/// Accounts:
/// 0. `[signer, writable]` Payer (relayer or recipient)
/// 1. `[writable]` Pool config
/// 2. `[]` Epoch tree (historic root check)
/// 3. `[writable]` Nullifier marker
/// 4. `[]` Vault authority
/// 5. `[writable]` Vault
/// 6. `[writable]` Destination token account
/// 7. `[]` Verifier config ("withdraw")
/// 8. `[]` Mint
/// 9. `[]` Token program
/// 10. `[]` System program
pub fn withdraw(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    destination_token: &Pubkey,
    token_program: &Pubkey,
    args: &WithdrawArgs,
) -> Result<Instruction, TxBuilderError> {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (epoch_tree, _) =
        epoch_tree_address(program_id, &pool_config, args.public_inputs.epoch);
    let (nullifier_marker, _) =
        nullifier_marker_address(program_id, &pool_config, &args.public_inputs.nullifier);
    let (vault_authority, _) = vault_authority_address(program_id, &pool_config);
    let (vault, _) = vault_address(program_id, &pool_config);
    let (verifier_config, _) =
        verifier_config_address(program_id, &pool_config, WITHDRAW_CIRCUIT);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool_config, false),
            AccountMeta::new_readonly(epoch_tree, false),
            AccountMeta::new(nullifier_marker, false),
            AccountMeta::new_readonly(vault_authority, false),
            AccountMeta::new(vault, false),
            AccountMeta::new(*destination_token, false),
            AccountMeta::new_readonly(verifier_config, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*token_program, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data(&discriminator::WITHDRAW_V2, args)?,
    })
}

/// Accounts:
/// 0. `[signer, writable]` Payer
/// 1. `[writable]` Pool config
/// 2. `[writable]` Output epoch tree
/// 3. `[writable]` Output leaf chunk
/// 4. `[writable]` Nullifier marker (input 0)
/// 5. `[writable]` Nullifier marker (input 1)
/// 6. `[]` Verifier config ("transfer")
/// 7. `[]` System program
pub fn transfer(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    chunk_index: u32,
    args: &TransferArgs,
) -> Result<Instruction, TxBuilderError> {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (epoch_tree, _) =
        epoch_tree_address(program_id, &pool_config, args.public_inputs.output_epoch);
    let (leaf_chunk, _) = leaf_chunk_address(
        program_id,
        &pool_config,
        args.public_inputs.output_epoch,
        chunk_index,
    );
    let (marker_zero, _) =
        nullifier_marker_address(program_id, &pool_config, &args.public_inputs.nullifiers[0]);
    let (marker_one, _) =
        nullifier_marker_address(program_id, &pool_config, &args.public_inputs.nullifiers[1]);
    let (verifier_config, _) =
        verifier_config_address(program_id, &pool_config, TRANSFER_CIRCUIT);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool_config, false),
            AccountMeta::new(epoch_tree, false),
            AccountMeta::new(leaf_chunk, false),
            AccountMeta::new(marker_zero, false),
            AccountMeta::new(marker_one, false),
            AccountMeta::new_readonly(verifier_config, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data(&discriminator::TRANSFER_V2, args)?,
    })
}

/// Accounts:
/// 0. `[signer, writable]` Payer
/// 1. `[writable]` Pool config
/// 2. `[]` Source epoch tree
/// 3. `[writable]` Target epoch tree
/// 4. `[writable]` Target leaf chunk
/// 5. `[writable]` Nullifier marker
/// 6. `[]` Verifier config ("renew")
/// 7. `[]` System program
pub fn renew_note(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    chunk_index: u32,
    args: &RenewArgs,
) -> Result<Instruction, TxBuilderError> {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (source_tree, _) =
        epoch_tree_address(program_id, &pool_config, args.public_inputs.source_epoch);
    let (target_tree, _) =
        epoch_tree_address(program_id, &pool_config, args.public_inputs.target_epoch);
    let (leaf_chunk, _) = leaf_chunk_address(
        program_id,
        &pool_config,
        args.public_inputs.target_epoch,
        chunk_index,
    );
    let (nullifier_marker, _) =
        nullifier_marker_address(program_id, &pool_config, &args.public_inputs.nullifier);
    let (verifier_config, _) = verifier_config_address(program_id, &pool_config, RENEW_CIRCUIT);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool_config, false),
            AccountMeta::new_readonly(source_tree, false),
            AccountMeta::new(target_tree, false),
            AccountMeta::new(leaf_chunk, false),
            AccountMeta::new(nullifier_marker, false),
            AccountMeta::new_readonly(verifier_config, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: instruction_data(&discriminator::RENEW_NOTE, args)?,
    })
}

/// Accounts:
/// 0. `[signer, writable]` Payer
/// 1. `[writable]` Pool config
/// 2. `[writable]` Closing epoch tree
/// 3. `[writable]` New epoch tree
/// 4. `[]` System program
pub fn rollover_epoch(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    previous_epoch: u64,
    new_epoch: u64,
) -> Instruction {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (previous_tree, _) = epoch_tree_address(program_id, &pool_config, previous_epoch);
    let (new_tree, _) = epoch_tree_address(program_id, &pool_config, new_epoch);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool_config, false),
            AccountMeta::new(previous_tree, false),
            AccountMeta::new(new_tree, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data: discriminator::ROLLOVER_EPOCH.to_vec(),
    }
}

/// Accounts:
/// 0. `[signer]` Payer
/// 1. `[writable]` Pool config
/// 2. `[writable]` Epoch tree
pub fn finalize_epoch(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint: &Pubkey,
    args: &FinalizeEpochArgs,
) -> Result<Instruction, TxBuilderError> {
    let (pool_config, _) = pool_config_address(program_id, mint);
    let (epoch_tree, _) = epoch_tree_address(program_id, &pool_config, args.epoch);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(pool_config, false),
            AccountMeta::new(epoch_tree, false),
        ],
        data: instruction_data(&discriminator::FINALIZE_EPOCH, args)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GROTH16_PROOF_SIZE;

    fn program_id() -> Pubkey {
        Pubkey::new_from_array([0x11; 32])
    }

    fn mint() -> Pubkey {
        Pubkey::new_from_array([0x22; 32])
    }

    #[test]
    fn test_u64_borsh_layout() {
        let encoded = borsh::to_vec(&1_000_000u64).unwrap();
        assert_eq!(encoded, vec![0x40, 0x42, 0x0F, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_withdraw_data_layout() {
        let args = WithdrawArgs {
            proof: vec![0u8; GROTH16_PROOF_SIZE],
            public_inputs: WithdrawPublicInputs {
                root: [0xa1; 32],
                nullifier: [0xb2; 32],
                amount: 1_000_000,
                recipient: [0xc3; 32],
                epoch: 7,
                tx_anchor: [0xd4; 32],
                pool_id: [0xe5; 32],
            },
        };
        let data = instruction_data(&discriminator::WITHDRAW_V2, &args).unwrap();

        assert_eq!(data.len(), 8 + 4 + 256 + 176);
        assert_eq!(&data[..8], &discriminator::WITHDRAW_V2);
        assert_eq!(&data[8..12], &(GROTH16_PROOF_SIZE as u32).to_le_bytes());
        assert!(data[12..268].iter().all(|&b| b == 0));
        assert_eq!(&data[268..300], &[0xa1; 32]);
        assert_eq!(&data[300..332], &[0xb2; 32]);
        assert_eq!(&data[332..340], &1_000_000u64.to_le_bytes());
        assert_eq!(&data[340..372], &[0xc3; 32]);
        assert_eq!(&data[372..380], &7u64.to_le_bytes());
        assert_eq!(&data[380..412], &[0xd4; 32]);
        assert_eq!(&data[412..444], &[0xe5; 32]);
    }

    #[test]
    fn test_args_roundtrip() {
        let args = TransferArgs {
            proof: vec![1, 2, 3],
            public_inputs: TransferPublicInputs {
                root: [1; 32],
                nullifiers: [[2; 32], [3; 32]],
                output_commitments: [[4; 32], [5; 32]],
                output_epoch: 9,
                tx_anchor: [6; 32],
                pool_id: [7; 32],
            },
            encrypted_notes: vec![vec![8; 10], vec![9; 20]],
        };
        let encoded = borsh::to_vec(&args).unwrap();
        assert_eq!(TransferArgs::try_from_slice(&encoded).unwrap(), args);

        let renew = RenewArgs {
            proof: vec![0; 256],
            public_inputs: RenewPublicInputs {
                root: [1; 32],
                nullifier: [2; 32],
                new_commitment: [3; 32],
                source_epoch: 1,
                target_epoch: 5,
                tx_anchor: [4; 32],
                pool_id: [5; 32],
            },
            encrypted_note: vec![6; 40],
        };
        let encoded = borsh::to_vec(&renew).unwrap();
        assert_eq!(RenewArgs::try_from_slice(&encoded).unwrap(), renew);
    }

    #[test]
    fn test_deposit_data_layout() {
        let args = DepositArgs {
            commitment: [0xab; 32],
            amount: 42,
            encrypted_note: vec![1, 2, 3, 4, 5],
        };
        let data = instruction_data(&discriminator::DEPOSIT_V2, &args).unwrap();
        assert_eq!(data.len(), 8 + 32 + 8 + 4 + 5);
        assert_eq!(&data[..8], &discriminator::DEPOSIT_V2);
        assert_eq!(&data[8..40], &[0xab; 32]);
        assert_eq!(&data[40..48], &42u64.to_le_bytes());
        assert_eq!(&data[48..52], &5u32.to_le_bytes());
    }

    #[test]
    fn test_pda_derivation_deterministic() {
        let (pool_a, bump_a) = pool_config_address(&program_id(), &mint());
        let (pool_b, bump_b) = pool_config_address(&program_id(), &mint());
        assert_eq!(pool_a, pool_b);
        assert_eq!(bump_a, bump_b);

        let (tree_one, _) = epoch_tree_address(&program_id(), &pool_a, 1);
        let (tree_two, _) = epoch_tree_address(&program_id(), &pool_a, 2);
        assert_ne!(tree_one, tree_two);

        let (vault, _) = vault_address(&program_id(), &pool_a);
        let (authority, _) = vault_authority_address(&program_id(), &pool_a);
        assert_ne!(vault, authority);

        let (chunk_zero, _) = leaf_chunk_address(&program_id(), &pool_a, 1, 0);
        let (chunk_one, _) = leaf_chunk_address(&program_id(), &pool_a, 1, 1);
        assert_ne!(chunk_zero, chunk_one);

        let (withdraw_vk, _) = verifier_config_address(&program_id(), &pool_a, WITHDRAW_CIRCUIT);
        let (transfer_vk, _) = verifier_config_address(&program_id(), &pool_a, TRANSFER_CIRCUIT);
        assert_ne!(withdraw_vk, transfer_vk);
    }

    #[test]
    fn test_leaf_chunk_index() {
        assert_eq!(leaf_chunk_index(0), 0);
        assert_eq!(leaf_chunk_index(255), 0);
        assert_eq!(leaf_chunk_index(256), 1);
        assert_eq!(leaf_chunk_index(4095), 15);
    }

    #[test]
    fn test_deposit_account_order() {
        let depositor = Pubkey::new_from_array([0x33; 32]);
        let depositor_token = Pubkey::new_from_array([0x44; 32]);
        let token_program = Pubkey::new_from_array([0x55; 32]);

        let ix = deposit(
            &program_id(),
            &depositor,
            &depositor_token,
            &mint(),
            &token_program,
            0,
            0,
            &DepositArgs {
                commitment: [0; 32],
                amount: 1,
                encrypted_note: vec![],
            },
        )
        .unwrap();

        assert_eq!(ix.program_id, program_id());
        assert_eq!(ix.accounts.len(), 9);
        assert_eq!(ix.accounts[0].pubkey, depositor);
        assert!(ix.accounts[0].is_signer);
        assert!(ix.accounts[0].is_writable);
        assert!(!ix.accounts[6].is_writable); // mint
        assert_eq!(ix.accounts[8].pubkey, SYSTEM_PROGRAM_ID);
    }

    #[test]
    fn test_withdraw_instruction_accounts() {
        let payer = Pubkey::new_from_array([0x66; 32]);
        let destination = Pubkey::new_from_array([0x77; 32]);
        let token_program = Pubkey::new_from_array([0x55; 32]);

        let args = WithdrawArgs {
            proof: vec![0; 256],
            public_inputs: WithdrawPublicInputs {
                root: [0; 32],
                nullifier: [9; 32],
                amount: 1,
                recipient: [0; 32],
                epoch: 3,
                tx_anchor: [0; 32],
                pool_id: [0; 32],
            },
        };
        let ix = withdraw(&program_id(), &payer, &mint(), &destination, &token_program, &args)
            .unwrap();

        let (pool_config, _) = pool_config_address(&program_id(), &mint());
        let (expected_marker, _) =
            nullifier_marker_address(&program_id(), &pool_config, &[9; 32]);

        assert_eq!(ix.accounts.len(), 11);
        assert_eq!(ix.accounts[3].pubkey, expected_marker);
        assert!(ix.accounts[3].is_writable);
        assert!(!ix.accounts[2].is_writable); // historic epoch tree is read-only
    }
}
