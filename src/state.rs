//! Persistent, content-addressed state store
//!
//! A state item is the record
//! `[state_length:2][state_address:2][state_instruction:2][minimum_access_length:2] ++ value`
//! identified by the SHA-1 digest of that record. Committed items are keyed by
//! the first `STATE_MIN_ACCESS_LEN` bytes of the digest whatever minimum
//! access length the program asked for, so any 6..=20 byte prefix of the
//! identifier reaches them.
//!
//! The store outlives every message and is shared between concurrent decodes
//! through `SharedStateStore`.

use crate::digest::{sha1, SHA1_LEN};
use crate::error::FailureReason;
use indexmap::IndexMap;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Storage key length for committed state
pub const STATE_MIN_ACCESS_LEN: usize = 6;
/// Longest usable partial identifier
pub const STATE_MAX_ACCESS_LEN: usize = SHA1_LEN;
/// Size of the record header preceding the state value
pub const STATE_HEADER_LEN: usize = 8;

pub type StateIdentifier = [u8; SHA1_LEN];
type StorageKey = [u8; STATE_MIN_ACCESS_LEN];

/// Store handle shared between decoders
pub type SharedStateStore = Arc<Mutex<StateStore>>;

/// Check a partial identifier length against 6..=20
pub fn validate_partial_id_length(length: usize) -> Result<(), FailureReason> {
    if (STATE_MIN_ACCESS_LEN..=STATE_MAX_ACCESS_LEN).contains(&length) {
        Ok(())
    } else {
        Err(FailureReason::InvalidPartialIdLength)
    }
}

/// Build a state record from its header fields and value
pub fn build_record(
    state_address: u16,
    state_instruction: u16,
    minimum_access_length: u16,
    value: &[u8],
) -> Vec<u8> {
    let mut record = Vec::with_capacity(STATE_HEADER_LEN + value.len());
    record.extend_from_slice(&(value.len() as u16).to_be_bytes());
    record.extend_from_slice(&state_address.to_be_bytes());
    record.extend_from_slice(&state_instruction.to_be_bytes());
    record.extend_from_slice(&minimum_access_length.to_be_bytes());
    record.extend_from_slice(value);
    record
}

/// A stored state item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateItem {
    identifier: StateIdentifier,
    record: Vec<u8>,
    retention_priority: u16,
    builtin: bool,
}

impl StateItem {
    /// Item identified by the digest of its record
    pub fn from_record(record: Vec<u8>, retention_priority: u16) -> Self {
        StateItem {
            identifier: sha1(&record),
            record,
            retention_priority,
            builtin: false,
        }
    }

    /// Item registered under a fixed, externally defined identifier
    pub fn builtin(identifier: StateIdentifier, record: Vec<u8>) -> Self {
        StateItem {
            identifier,
            record,
            retention_priority: u16::MAX,
            builtin: true,
        }
    }

    fn header_word(&self, index: usize) -> u16 {
        match self.record.get(index..index + 2) {
            Some(b) => u16::from_be_bytes([b[0], b[1]]),
            None => 0,
        }
    }

    pub fn identifier(&self) -> &StateIdentifier {
        &self.identifier
    }

    pub fn state_length(&self) -> u16 {
        self.header_word(0)
    }

    pub fn state_address(&self) -> u16 {
        self.header_word(2)
    }

    pub fn state_instruction(&self) -> u16 {
        self.header_word(4)
    }

    pub fn minimum_access_length(&self) -> u16 {
        self.header_word(6)
    }

    pub fn retention_priority(&self) -> u16 {
        self.retention_priority
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// The state value following the header
    pub fn value(&self) -> &[u8] {
        self.record.get(STATE_HEADER_LEN..).unwrap_or(&[])
    }

    /// The full record, header included
    pub fn record(&self) -> &[u8] {
        &self.record
    }
}

/// Process-wide state dictionary
#[derive(Debug, Default)]
pub struct StateStore {
    items: IndexMap<StorageKey, Arc<StateItem>>,
    /// Byte budget for non-built-in state, None for unbounded
    capacity: Option<usize>,
    used: usize,
}

fn storage_key(identifier: &[u8]) -> StorageKey {
    let mut key = [0u8; STATE_MIN_ACCESS_LEN];
    key.copy_from_slice(&identifier[..STATE_MIN_ACCESS_LEN]);
    key
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        StateStore {
            capacity,
            ..Self::default()
        }
    }

    pub fn into_shared(self) -> SharedStateStore {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bytes held by committed (non-built-in) state
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Register a static dictionary; it is never evicted or freed
    pub fn insert_builtin(&mut self, identifier: StateIdentifier, record: Vec<u8>) {
        debug!(
            "registering built-in state {:02x?} ({} bytes)",
            &identifier[..STATE_MIN_ACCESS_LEN],
            record.len()
        );
        self.items.insert(
            storage_key(&identifier),
            Arc::new(StateItem::builtin(identifier, record)),
        );
    }

    /// Find the item whose identifier starts with `partial`
    pub fn lookup(&self, partial: &[u8]) -> Result<Arc<StateItem>, FailureReason> {
        validate_partial_id_length(partial.len())?;
        match self.items.get(&storage_key(partial)) {
            Some(item) if item.identifier.starts_with(partial) => Ok(Arc::clone(item)),
            _ => {
                debug!("no state matches {:02x?}", partial);
                Err(FailureReason::NoStateMatch)
            }
        }
    }

    pub fn contains(&self, partial: &[u8]) -> bool {
        self.lookup(partial).is_ok()
    }

    /// Insert a record under its SHA-1 digest and return the identifier.
    /// Re-committing an existing record refreshes its age.
    pub fn commit(&mut self, record: Vec<u8>, retention_priority: u16) -> StateIdentifier {
        let item = StateItem::from_record(record, retention_priority);
        let identifier = item.identifier;
        let key = storage_key(&identifier);

        if let Some(existing) = self.items.get(&key) {
            if existing.builtin {
                warn!(
                    "state {:02x?} collides with a built-in dictionary, not stored",
                    key
                );
                return identifier;
            }
        }
        if let Some(previous) = self.items.shift_remove(&key) {
            self.used -= previous.record.len();
        }

        self.used += item.record.len();
        self.items.insert(key, Arc::new(item));
        debug!("committed state {:02x?}", identifier);
        self.evict(&key);
        identifier
    }

    /// Remove the item matching `partial`. Built-in items stay.
    pub fn free(&mut self, partial: &[u8]) -> Result<bool, FailureReason> {
        validate_partial_id_length(partial.len())?;
        let key = storage_key(partial);
        let removable = matches!(
            self.items.get(&key),
            Some(item) if !item.builtin && item.identifier.starts_with(partial)
        );
        if !removable {
            return Ok(false);
        }
        if let Some(item) = self.items.shift_remove(&key) {
            self.used -= item.record.len();
            debug!("freed state {:02x?}", item.identifier);
        }
        Ok(true)
    }

    /// Drop lowest-priority, oldest items until the budget fits. The item
    /// under `keep` was just committed and goes last.
    fn evict(&mut self, keep: &StorageKey) {
        let capacity = match self.capacity {
            Some(c) => c,
            None => return,
        };
        while self.used > capacity {
            let victim = self
                .items
                .iter()
                .filter(|(key, item)| !item.builtin && *key != keep)
                .min_by_key(|(_, item)| item.retention_priority)
                .map(|(key, _)| *key);
            let key = match victim {
                Some(key) => key,
                None => break,
            };
            if let Some(item) = self.items.shift_remove(&key) {
                self.used -= item.record.len();
                debug!(
                    "evicted state {:02x?} (priority {})",
                    item.identifier, item.retention_priority
                );
            }
        }
    }
}
