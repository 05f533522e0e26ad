//! End-to-end note lifecycle: deposit event -> discovery -> Merkle proof
//! -> spend by nullifier, and the full withdraw/renew preparation pipeline
//! against the mock prover.

use rand::rngs::OsRng;
use shielded_pool_sdk::events::{DepositEvent, EpochRolloverEvent, WithdrawEvent};
use shielded_pool_sdk::instruction::{self, WithdrawArgs};
use shielded_pool_sdk::note::{seal_note, Note};
use shielded_pool_sdk::{
    EpochTree, MockProver, NoteStore, PoolEvent, Scanner, SpendingKeys, TransactionBuilder,
    GROTH16_PROOF_SIZE,
};
use solana_pubkey::Pubkey;

const POOL: [u8; 32] = [0x50; 32];
const TOKEN: [u8; 32] = [0xaa; 32];

fn wallet() -> SpendingKeys {
    let mut seed = [0u8; 32];
    for (i, byte) in seed.iter_mut().enumerate() {
        *byte = i as u8;
    }
    SpendingKeys::from_seed(seed)
}

#[test]
fn deposit_merkle_nullifier_lifecycle() {
    let keys = wallet();
    let scanner = Scanner::new(keys.viewing_key, TOKEN, POOL);
    let mut store = NoteStore::with_nullifier_key(TOKEN, keys.nullifier_key);
    let mut tree = EpochTree::new(0);

    // A deposit of 1_000_000 lands in epoch 0 at leaf 0.
    let note = Note::new(1_000_000, TOKEN, keys.shielded_address, [0x0c; 32], None).unwrap();
    let sealed = seal_note(&note, &keys.viewing_key, &mut OsRng).unwrap();

    let (leaf_index, new_root) = tree.insert(note.commitment).unwrap();
    assert_eq!(leaf_index, 0);

    let deposit = PoolEvent::Deposit(DepositEvent {
        epoch: 0,
        pool: POOL,
        commitment: note.commitment,
        leaf_index,
        new_root,
        encrypted_note: sealed,
    })
    .encode();

    scanner.process(&deposit, &mut store).unwrap();
    assert_eq!(store.balance(), 1_000_000);
    assert_eq!(store.balance_info().note_count, 1);

    // Its inclusion proof verifies against the emitted root.
    let proof = tree.proof(leaf_index).unwrap();
    assert_eq!(proof.root, new_root);
    assert!(proof.verify());
    assert!(tree.is_known_root(&new_root));

    // The matching nullifier event drains the balance.
    let nullifier = store.get(&note.commitment).unwrap().nullifier.unwrap();
    let withdraw = PoolEvent::Withdraw(WithdrawEvent {
        epoch: 0,
        pool: POOL,
        nullifier,
        amount: 1_000_000,
        recipient: [0x99; 32],
    })
    .encode();

    scanner.process(&withdraw, &mut store).unwrap();
    assert_eq!(store.balance(), 0);
    let info = store.balance_info();
    assert_eq!(info.note_count, 0);
    assert_eq!(info.total, 0);
}

#[test]
fn withdraw_pipeline_to_instruction() {
    let keys = wallet();
    let scanner = Scanner::new(keys.viewing_key, TOKEN, POOL);
    let mut store = NoteStore::with_nullifier_key(TOKEN, keys.nullifier_key);
    let mut tree = EpochTree::new(0);

    let note = Note::new(2_500_000, TOKEN, keys.shielded_address, [0x0d; 32], None).unwrap();
    let sealed = seal_note(&note, &keys.viewing_key, &mut OsRng).unwrap();
    let (leaf_index, new_root) = tree.insert(note.commitment).unwrap();

    let deposit = PoolEvent::Deposit(DepositEvent {
        epoch: 0,
        pool: POOL,
        commitment: note.commitment,
        leaf_index,
        new_root,
        encrypted_note: sealed,
    })
    .encode();
    scanner.process(&deposit, &mut store).unwrap();

    // Select, prove, and encode the withdrawal.
    let selected = store.select_notes(2_000_000, 1).unwrap();
    assert_eq!(selected.len(), 1);

    let prover = MockProver;
    let builder = TransactionBuilder::new(&prover, &keys, TOKEN, POOL);
    let prepared = builder
        .prepare_withdraw(&selected[0], &tree, [0x99; 32])
        .unwrap();
    assert_eq!(prepared.proof_bytes.len(), GROTH16_PROOF_SIZE);

    let args = WithdrawArgs::from_prepared(&prepared, tree.root(), [0; 32], POOL);
    let program_id = Pubkey::new_from_array([0x11; 32]);
    let mint = Pubkey::new_from_array(TOKEN);
    let payer = Pubkey::new_from_array([0x66; 32]);
    let destination = Pubkey::new_from_array([0x77; 32]);
    let token_program = Pubkey::new_from_array([0x88; 32]);

    let ix = instruction::withdraw(
        &program_id,
        &payer,
        &mint,
        &destination,
        &token_program,
        &args,
    )
    .unwrap();

    assert_eq!(&ix.data[..8], &instruction::discriminator::WITHDRAW_V2);
    assert_eq!(ix.data.len(), 8 + 4 + 256 + 176);
}

#[test]
fn renewal_moves_note_across_epochs() {
    let keys = wallet();
    let scanner = Scanner::new(keys.viewing_key, TOKEN, POOL);
    let mut store = NoteStore::with_nullifier_key(TOKEN, keys.nullifier_key);
    let mut old_tree = EpochTree::new(0);

    let note = Note::new(5_000, TOKEN, keys.shielded_address, [0x0e; 32], None).unwrap();
    let sealed = seal_note(&note, &keys.viewing_key, &mut OsRng).unwrap();
    let (leaf_index, new_root) = old_tree.insert(note.commitment).unwrap();

    let deposit = PoolEvent::Deposit(DepositEvent {
        epoch: 0,
        pool: POOL,
        commitment: note.commitment,
        leaf_index,
        new_root,
        encrypted_note: sealed,
    })
    .encode();
    scanner.process(&deposit, &mut store).unwrap();

    // Epoch rolls over; the old tree freezes.
    let rollover = PoolEvent::EpochRollover(EpochRolloverEvent {
        previous_epoch: 0,
        new_epoch: 1,
        pool: POOL,
    })
    .encode();
    scanner.process(&rollover, &mut store).unwrap();
    old_tree.freeze();
    assert_eq!(store.current_epoch(), 1);

    // Prepare the renewal into epoch 1.
    let prover = MockProver;
    let builder = TransactionBuilder::new(&prover, &keys, TOKEN, POOL);
    let stored = store.get(&note.commitment).unwrap().clone();
    let prepared = builder
        .prepare_renew(&stored, &old_tree, 1, &mut OsRng)
        .unwrap();

    assert_eq!(prepared.new_note.value, 5_000);
    assert_ne!(prepared.new_commitment, note.commitment);

    // The ledger emits the renewal; the old note dies and the new one lives
    // in the current epoch.
    let mut target_tree = EpochTree::new(1);
    let (new_leaf, _) = target_tree.insert(prepared.new_commitment).unwrap();

    let renew = PoolEvent::Renew(shielded_pool_sdk::events::RenewEvent {
        source_epoch: 0,
        target_epoch: 1,
        pool: POOL,
        nullifier: prepared.old_nullifier,
        commitment: prepared.new_commitment,
        leaf_index: new_leaf,
        encrypted_note: prepared.encrypted_note.clone(),
    })
    .encode();
    scanner.process(&renew, &mut store).unwrap();

    assert!(store.get(&note.commitment).unwrap().spent);
    let renewed = store.get(&prepared.new_commitment).unwrap();
    assert_eq!(renewed.epoch, Some(1));
    assert!(!renewed.spent);
    assert_eq!(store.balance(), 5_000);
}
