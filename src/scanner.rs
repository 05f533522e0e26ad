//! Event scanner
//!
//! Drives note discovery from raw event records: trial-decrypts ciphertexts
//! with the viewing key, confirms recovered notes into the store, marks
//! spends by nullifier and advances the epoch clock on rollover.
//!
//! Most ciphertexts belong to other users, so decryption failure is the
//! common case and never an error. A ciphertext that decrypts but whose
//! recomputed commitment disagrees with the event is dropped: the sender
//! lied about the note contents.

use tracing::{debug, trace, warn};

use crate::error::ScannerError;
use crate::events::{parse_event, PoolEvent};
use crate::note::open_note;
use crate::note_store::NoteStore;

/// Watches one pool for notes owned by one viewing key.
#[derive(Clone, Debug)]
pub struct Scanner {
    viewing_key: [u8; 32],
    token: [u8; 32],
    pool: [u8; 32],
}

impl Scanner {
    pub fn new(viewing_key: [u8; 32], token: [u8; 32], pool: [u8; 32]) -> Self {
        Self {
            viewing_key,
            token,
            pool,
        }
    }

    pub fn pool(&self) -> &[u8; 32] {
        &self.pool
    }

    /// Process one raw event record against the note store.
    ///
    /// Returns the parsed event when it targeted this scanner's pool;
    /// `None` for foreign pools, unknown discriminators and truncated
    /// records.
    pub fn process(&self, data: &[u8], store: &mut NoteStore) -> Option<PoolEvent> {
        let event = parse_event(data)?;
        if event.pool() != &self.pool {
            trace!("skipping event for another pool");
            return None;
        }

        match &event {
            PoolEvent::Deposit(e) => {
                self.accept_output(store, &e.encrypted_note, &e.commitment, e.epoch, e.leaf_index);
            }
            PoolEvent::Withdraw(e) => {
                self.mark_spent(store, &e.nullifier, Some(e.epoch));
            }
            PoolEvent::Transfer(e) => {
                for (position, nullifier) in e.nullifiers.iter().enumerate() {
                    let hint = e.input_epochs.get(position).copied();
                    self.mark_spent(store, nullifier, hint);
                }
                for (position, blob) in e.encrypted_notes.iter().enumerate() {
                    let (Some(commitment), Some(leaf_index)) = (
                        e.commitments.get(position),
                        e.leaf_indices.get(position).copied(),
                    ) else {
                        warn!(position, "transfer event output without commitment metadata");
                        continue;
                    };
                    self.accept_output(store, blob, commitment, e.output_epoch, leaf_index);
                }
            }
            PoolEvent::Renew(e) => {
                self.mark_spent(store, &e.nullifier, Some(e.source_epoch));
                self.accept_output(
                    store,
                    &e.encrypted_note,
                    &e.commitment,
                    e.target_epoch,
                    e.leaf_index,
                );
            }
            PoolEvent::EpochRollover(e) => {
                debug!(previous = e.previous_epoch, new = e.new_epoch, "epoch rollover");
                store.set_current_epoch(e.new_epoch);
            }
            PoolEvent::EpochFinalized(e) => {
                debug!(epoch = e.epoch, "epoch finalized");
            }
        }

        Some(event)
    }

    /// Process a batch of raw records in arrival order.
    pub fn scan<'a, I>(&self, records: I, store: &mut NoteStore) -> Vec<PoolEvent>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        records
            .into_iter()
            .filter_map(|data| self.process(data, store))
            .collect()
    }

    fn mark_spent(&self, store: &mut NoteStore, nullifier: &[u8; 32], epoch_hint: Option<u64>) {
        match store.mark_spent_by_nullifier(nullifier, epoch_hint) {
            Ok(true) => debug!("marked owned note spent"),
            Ok(false) => trace!("nullifier not ours"),
            Err(err) => warn!(%err, "failed to match nullifier"),
        }
    }

    fn accept_output(
        &self,
        store: &mut NoteStore,
        blob: &[u8],
        commitment: &[u8; 32],
        epoch: u64,
        leaf_index: u32,
    ) {
        match self.try_accept_output(store, blob, commitment, epoch, leaf_index) {
            Ok(()) => debug!(epoch, leaf_index, "recovered owned note"),
            Err(ScannerError::DecryptionFailed) => trace!("ciphertext not ours"),
            Err(err) => warn!(%err, "dropped note ciphertext"),
        }
    }

    fn try_accept_output(
        &self,
        store: &mut NoteStore,
        blob: &[u8],
        commitment: &[u8; 32],
        epoch: u64,
        leaf_index: u32,
    ) -> Result<(), ScannerError> {
        if blob.len() < crate::NOTE_NONCE_SIZE {
            return Err(ScannerError::CiphertextTooShort);
        }

        let mut note =
            open_note(blob, &self.viewing_key).ok_or(ScannerError::DecryptionFailed)?;

        if &note.commitment != commitment {
            return Err(ScannerError::CommitmentMismatch);
        }
        if note.token != self.token {
            return Err(ScannerError::TokenMismatch);
        }

        note.epoch = Some(epoch);
        note.leaf_index = Some(leaf_index);
        store
            .add(note)
            .map_err(|_| ScannerError::InvalidEventData)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DepositEvent, EpochRolloverEvent, TransferEvent, WithdrawEvent};
    use crate::keys::SpendingKeys;
    use crate::note::{seal_note, Note};
    use rand::rngs::OsRng;

    const POOL: [u8; 32] = [0x50; 32];
    const TOKEN: [u8; 32] = [0xaa; 32];

    fn wallet() -> SpendingKeys {
        SpendingKeys::from_seed([7u8; 32])
    }

    fn setup() -> (Scanner, NoteStore) {
        let keys = wallet();
        let scanner = Scanner::new(keys.viewing_key, TOKEN, POOL);
        let store = NoteStore::with_nullifier_key(TOKEN, keys.nullifier_key);
        (scanner, store)
    }

    fn deposit_for(note: &Note, epoch: u64, leaf_index: u32, viewing_key: &[u8; 32]) -> Vec<u8> {
        let blob = seal_note(note, viewing_key, &mut OsRng).unwrap();
        PoolEvent::Deposit(DepositEvent {
            epoch,
            pool: POOL,
            commitment: note.commitment,
            leaf_index,
            new_root: [0; 32],
            encrypted_note: blob,
        })
        .encode()
    }

    #[test]
    fn test_recovers_owned_deposit() {
        let (scanner, mut store) = setup();
        let keys = wallet();
        let note = Note::new(1_000_000, TOKEN, keys.shielded_address, [3; 32], None).unwrap();

        let data = deposit_for(&note, 2, 11, &keys.viewing_key);
        assert!(scanner.process(&data, &mut store).is_some());

        let stored = store.get(&note.commitment).unwrap();
        assert_eq!(stored.epoch, Some(2));
        assert_eq!(stored.leaf_index, Some(11));
        assert!(stored.nullifier.is_some());
        assert_eq!(store.balance(), 1_000_000);
    }

    #[test]
    fn test_foreign_ciphertext_ignored() {
        let (scanner, mut store) = setup();
        let other = SpendingKeys::from_seed([99u8; 32]);
        let note = Note::new(500, TOKEN, other.shielded_address, [4; 32], None).unwrap();

        // Sealed under someone else's viewing key.
        let data = deposit_for(&note, 0, 0, &other.viewing_key);
        assert!(scanner.process(&data, &mut store).is_some());
        assert_eq!(store.notes().len(), 0);
    }

    #[test]
    fn test_commitment_mismatch_dropped() {
        let (scanner, mut store) = setup();
        let keys = wallet();
        let note = Note::new(500, TOKEN, keys.shielded_address, [5; 32], None).unwrap();

        let blob = seal_note(&note, &keys.viewing_key, &mut OsRng).unwrap();
        let data = PoolEvent::Deposit(DepositEvent {
            epoch: 0,
            pool: POOL,
            commitment: [0xde; 32], // lies about the note
            leaf_index: 0,
            new_root: [0; 32],
            encrypted_note: blob,
        })
        .encode();

        assert!(scanner.process(&data, &mut store).is_some());
        assert_eq!(store.notes().len(), 0);
    }

    #[test]
    fn test_foreign_pool_skipped() {
        let (scanner, mut store) = setup();
        let data = PoolEvent::EpochRollover(EpochRolloverEvent {
            previous_epoch: 0,
            new_epoch: 1,
            pool: [0x51; 32],
        })
        .encode();

        assert!(scanner.process(&data, &mut store).is_none());
        assert_eq!(store.current_epoch(), 0);
    }

    #[test]
    fn test_withdraw_spends_note() {
        let (scanner, mut store) = setup();
        let keys = wallet();
        let note = Note::new(750, TOKEN, keys.shielded_address, [6; 32], None).unwrap();

        let data = deposit_for(&note, 1, 4, &keys.viewing_key);
        scanner.process(&data, &mut store);

        let nullifier = store.get(&note.commitment).unwrap().nullifier.unwrap();
        let withdraw = PoolEvent::Withdraw(WithdrawEvent {
            epoch: 1,
            pool: POOL,
            nullifier,
            amount: 750,
            recipient: [9; 32],
        })
        .encode();

        scanner.process(&withdraw, &mut store);
        assert_eq!(store.balance(), 0);
    }

    #[test]
    fn test_spend_before_confirmation_is_noop() {
        let (scanner, mut store) = setup();
        let withdraw = PoolEvent::Withdraw(WithdrawEvent {
            epoch: 0,
            pool: POOL,
            nullifier: [0x42; 32],
            amount: 1,
            recipient: [9; 32],
        })
        .encode();

        assert!(scanner.process(&withdraw, &mut store).is_some());
        assert_eq!(store.notes().len(), 0);
    }

    #[test]
    fn test_transfer_spends_and_recovers() {
        let (scanner, mut store) = setup();
        let keys = wallet();

        let spent = Note::new(1000, TOKEN, keys.shielded_address, [7; 32], None).unwrap();
        scanner.process(&deposit_for(&spent, 0, 0, &keys.viewing_key), &mut store);
        let nullifier = store.get(&spent.commitment).unwrap().nullifier.unwrap();

        let change = Note::new(400, TOKEN, keys.shielded_address, [8; 32], None).unwrap();
        let other_blob = vec![0u8; 64]; // recipient output, not ours
        let change_blob = seal_note(&change, &keys.viewing_key, &mut OsRng).unwrap();

        let transfer = PoolEvent::Transfer(TransferEvent {
            output_epoch: 1,
            pool: POOL,
            nullifiers: vec![nullifier],
            input_epochs: vec![0],
            commitments: vec![[0xcd; 32], change.commitment],
            leaf_indices: vec![5, 6],
            encrypted_notes: vec![other_blob, change_blob],
        })
        .encode();

        scanner.process(&transfer, &mut store);

        assert!(store.get(&spent.commitment).unwrap().spent);
        let recovered = store.get(&change.commitment).unwrap();
        assert_eq!(recovered.epoch, Some(1));
        assert_eq!(recovered.leaf_index, Some(6));
        assert_eq!(store.balance(), 400);
    }

    #[test]
    fn test_rollover_advances_epoch() {
        let (scanner, mut store) = setup();
        let data = PoolEvent::EpochRollover(EpochRolloverEvent {
            previous_epoch: 0,
            new_epoch: 5,
            pool: POOL,
        })
        .encode();

        scanner.process(&data, &mut store);
        assert_eq!(store.current_epoch(), 5);
    }

    #[test]
    fn test_scan_batch_in_order() {
        let (scanner, mut store) = setup();
        let keys = wallet();
        let note = Note::new(10, TOKEN, keys.shielded_address, [9; 32], None).unwrap();

        let deposit = deposit_for(&note, 0, 0, &keys.viewing_key);
        let rollover = PoolEvent::EpochRollover(EpochRolloverEvent {
            previous_epoch: 0,
            new_epoch: 1,
            pool: POOL,
        })
        .encode();
        let garbage = vec![0u8; 3];

        let records: Vec<&[u8]> = vec![&deposit, &garbage, &rollover];
        let events = scanner.scan(records, &mut store);

        assert_eq!(events.len(), 2);
        assert_eq!(store.balance(), 10);
        assert_eq!(store.current_epoch(), 1);
    }
}
