//! Note store
//!
//! Owns the wallet's confirmed and pending notes. Confirmed notes keep
//! insertion order and are unique by commitment; adding a known commitment
//! only back-fills confirmation metadata, never the value. Spend marking is
//! idempotent and a nullifier nobody owns is a no-op.
//!
//! Coin selection drains old epochs first (epoch ascending, then value
//! descending) so that expiry risk decreases with every spend.

use std::collections::{HashMap, HashSet};

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NoteStoreError;
use crate::note::Note;
use crate::{DEFAULT_EPOCH_DURATION_SLOTS, DEFAULT_EXPIRY_SLOTS};

/// Expiry timing, derived from the pool's on-chain parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// How many epochs ahead of expiry a note counts as "expiring".
    pub warning_epochs: u64,
    pub epoch_duration_slots: u64,
    pub expiry_slots: u64,
}

impl ExpiryConfig {
    /// Number of epochs a note stays spendable after its own.
    pub fn expiry_epochs(&self) -> u64 {
        self.expiry_slots / self.epoch_duration_slots
    }
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            warning_epochs: 2,
            epoch_duration_slots: DEFAULT_EPOCH_DURATION_SLOTS,
            expiry_slots: DEFAULT_EXPIRY_SLOTS,
        }
    }
}

/// Derived balance view; not state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    /// Sum of all unspent confirmed notes.
    pub total: u64,
    /// Unspent, neither expiring nor expired.
    pub spendable: u64,
    /// Sum of pending (unconfirmed) notes.
    pub pending: u64,
    pub expiring: u64,
    pub expired: u64,
    /// Unspent confirmed note count.
    pub note_count: usize,
    pub pending_count: usize,
    /// Epoch at which the oldest unspent note expires.
    pub earliest_expiry: Option<u64>,
}

/// The wallet's collection of notes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NoteStore {
    notes: Vec<Note>,
    index: HashMap<[u8; 32], usize>,
    pending: Vec<Note>,
    nullifier_key: Option<[u8; 32]>,
    token: [u8; 32],
    current_epoch: u64,
    config: ExpiryConfig,
}

impl NoteStore {
    pub fn new(token: [u8; 32]) -> Self {
        Self {
            notes: Vec::new(),
            index: HashMap::new(),
            pending: Vec::new(),
            nullifier_key: None,
            token,
            current_epoch: 0,
            config: ExpiryConfig::default(),
        }
    }

    /// Store that can derive nullifiers for owned notes on confirmation.
    pub fn with_nullifier_key(token: [u8; 32], nullifier_key: [u8; 32]) -> Self {
        let mut store = Self::new(token);
        store.nullifier_key = Some(nullifier_key);
        store
    }

    pub fn set_expiry_config(&mut self, config: ExpiryConfig) {
        self.config = config;
    }

    pub fn expiry_config(&self) -> &ExpiryConfig {
        &self.config
    }

    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    pub fn set_current_epoch(&mut self, epoch: u64) {
        self.current_epoch = epoch;
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn pending_notes(&self) -> &[Note] {
        &self.pending
    }

    pub fn get(&self, commitment: &[u8; 32]) -> Option<&Note> {
        self.index.get(commitment).map(|&pos| &self.notes[pos])
    }

    /// Add a confirmed (or confirming) note.
    ///
    /// A known commitment only gains previously-absent `epoch` and
    /// `leaf_index`; its value is never touched. A matching pending entry
    /// is promoted away.
    pub fn add(&mut self, mut note: Note) -> Result<(), NoteStoreError> {
        if let Some(&pos) = self.index.get(&note.commitment) {
            let existing = &mut self.notes[pos];
            if existing.epoch.is_none() {
                existing.epoch = note.epoch;
            }
            if existing.leaf_index.is_none() {
                existing.leaf_index = note.leaf_index;
            }
            if existing.nullifier.is_none() {
                if let Some(key) = self.nullifier_key {
                    existing.recompute_nullifier(&key)?;
                }
            }
            return Ok(());
        }

        if let Some(key) = self.nullifier_key {
            note.recompute_nullifier(&key)?;
        }
        self.pending.retain(|p| p.commitment != note.commitment);
        self.index.insert(note.commitment, self.notes.len());
        self.notes.push(note);
        Ok(())
    }

    /// Track a note we created but have not yet seen on-chain.
    pub fn add_pending(&mut self, note: Note) {
        if self.index.contains_key(&note.commitment)
            || self.pending.iter().any(|p| p.commitment == note.commitment)
        {
            return;
        }
        self.pending.push(note);
    }

    /// Build a fresh pending note (OS randomness) and track it.
    pub fn create_note(
        &mut self,
        value: u64,
        owner: [u8; 32],
        token: Option<[u8; 32]>,
    ) -> Result<Note, NoteStoreError> {
        let token = token.unwrap_or(self.token);
        let note = Note::generate(value, token, owner, &mut OsRng)?;
        self.add_pending(note.clone());
        Ok(note)
    }

    /// Mark the note with this commitment spent. Idempotent.
    pub fn mark_spent(&mut self, commitment: &[u8; 32]) -> bool {
        if let Some(&pos) = self.index.get(commitment) {
            let note = &mut self.notes[pos];
            if !note.spent {
                note.spent = true;
                return true;
            }
        }
        false
    }

    /// Mark the first unspent note matching this nullifier spent.
    ///
    /// A nullifier nobody here owns is a no-op (`Ok(false)`), including
    /// spends observed before the corresponding confirmation.
    pub fn mark_spent_by_nullifier(
        &mut self,
        nullifier: &[u8; 32],
        epoch_hint: Option<u64>,
    ) -> Result<bool, NoteStoreError> {
        let key = self.nullifier_key;

        for note in self.notes.iter_mut().filter(|n| !n.spent) {
            if let Some(hint) = epoch_hint {
                if note.epoch != Some(hint) {
                    continue;
                }
            }

            if note.nullifier.is_none() {
                if let (Some(key), true) = (key, note.is_confirmed()) {
                    note.recompute_nullifier(&key)?;
                }
            }

            if note.nullifier.as_ref() == Some(nullifier) {
                note.spent = true;
                debug!(value = note.value, "note spent by observed nullifier");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Greedy coin selection: oldest epoch first, larger values first
    /// within an epoch, until the amount and the minimum count are both
    /// satisfied.
    pub fn select_notes(
        &self,
        amount: u64,
        min_notes: usize,
    ) -> Result<Vec<Note>, NoteStoreError> {
        if min_notes == 0 {
            return Err(NoteStoreError::InvalidMinNotes);
        }

        let mut seen = HashSet::new();
        let mut candidates: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| !n.spent && seen.insert(n.commitment))
            .collect();

        let have: u64 = candidates.iter().map(|n| n.value).sum();
        if have < amount {
            return Err(NoteStoreError::InsufficientBalance { have, need: amount });
        }
        if candidates.len() < min_notes {
            return Err(NoteStoreError::InsufficientNotes {
                have: candidates.len(),
                need: min_notes,
            });
        }

        candidates.sort_by(|a, b| {
            let ea = a.epoch.unwrap_or(u64::MAX);
            let eb = b.epoch.unwrap_or(u64::MAX);
            ea.cmp(&eb).then(b.value.cmp(&a.value))
        });

        let mut selected = Vec::new();
        let mut sum = 0u64;
        for note in candidates {
            if sum >= amount && selected.len() >= min_notes {
                break;
            }
            sum += note.value;
            selected.push(note.clone());
        }

        Ok(selected)
    }

    /// Up to `max` expiring notes, oldest epoch first.
    pub fn select_notes_for_renewal(&self, max: usize) -> Vec<Note> {
        let mut notes: Vec<&Note> = self.expiring_notes();
        notes.sort_by_key(|n| n.epoch.unwrap_or(u64::MAX));
        notes.into_iter().take(max).cloned().collect()
    }

    /// Unspent notes from past epochs approaching their expiry horizon.
    pub fn expiring_notes(&self) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| !n.spent && self.is_expiring(n))
            .collect()
    }

    /// Unspent notes that already passed the expiry horizon.
    pub fn expired_notes(&self) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| !n.spent && self.is_expired(n))
            .collect()
    }

    fn is_expired(&self, note: &Note) -> bool {
        match note.epoch {
            Some(epoch) => self
                .current_epoch
                .checked_sub(self.config.expiry_epochs())
                .is_some_and(|cutoff| epoch < cutoff),
            None => false,
        }
    }

    fn is_expiring(&self, note: &Note) -> bool {
        match note.epoch {
            Some(epoch) => {
                !self.is_expired(note)
                    && epoch < self.current_epoch
                    && epoch <= self.current_epoch + self.config.warning_epochs
            }
            None => false,
        }
    }

    /// Sum of all unspent confirmed notes.
    pub fn balance(&self) -> u64 {
        self.notes.iter().filter(|n| !n.spent).map(|n| n.value).sum()
    }

    pub fn balance_info(&self) -> BalanceInfo {
        let mut info = BalanceInfo {
            pending: self.pending.iter().map(|n| n.value).sum(),
            pending_count: self.pending.len(),
            ..BalanceInfo::default()
        };

        for note in self.notes.iter().filter(|n| !n.spent) {
            info.total += note.value;
            info.note_count += 1;

            if self.is_expired(note) {
                info.expired += note.value;
            } else if self.is_expiring(note) {
                info.expiring += note.value;
            } else {
                info.spendable += note.value;
            }

            if let Some(epoch) = note.epoch {
                let expiry = epoch + self.config.expiry_epochs();
                info.earliest_expiry = Some(match info.earliest_expiry {
                    Some(current) => current.min(expiry),
                    None => expiry,
                });
            }
        }

        info
    }
}
