//! In-memory entry storage.

use super::{EntryStore, StoreError, StoreResult};
use crate::model::entry::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Map-backed [`EntryStore`] guarded by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `entries`, keyed by slug.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Entry>,
    {
        let map = entries
            .into_iter()
            .map(|entry| (entry.slug(), entry))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// Stores `entry` under an explicit id, bypassing validation.
    ///
    /// Lets callers model storage that drifted from the slug rules.
    pub fn insert_raw(&self, id: impl Into<String>, entry: Entry) -> StoreResult<()> {
        self.lock()?.insert(id.into(), entry);
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("entry map lock poisoned".to_string()))
    }
}

impl EntryStore for MemoryEntryStore {
    fn read_entry(&self, id: &str) -> StoreResult<Entry> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list_ids(&self) -> StoreResult<BTreeSet<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn write_entry(&self, entry: &Entry) -> StoreResult<()> {
        entry.validate()?;
        let slug = entry.slug();
        let mut entries = self.lock()?;
        if let Some(existing) = entries.get(&slug) {
            if existing.name != entry.name {
                return Err(StoreError::Duplicate(slug));
            }
        }
        entries.insert(slug, entry.clone());
        Ok(())
    }

    fn delete_entry(&self, id: &str) -> StoreResult<()> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn rename_entry(&self, old_id: &str, renamed: &Entry) -> StoreResult<()> {
        renamed.validate()?;
        let new_id = renamed.slug();
        let mut entries = self.lock()?;
        if !entries.contains_key(old_id) {
            return Err(StoreError::NotFound(old_id.to_string()));
        }
        if new_id != old_id && entries.contains_key(&new_id) {
            return Err(StoreError::Duplicate(new_id));
        }
        entries.remove(old_id);
        entries.insert(new_id, renamed.clone());
        Ok(())
    }
}
