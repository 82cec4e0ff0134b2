//! Persistence collaborator contract.
//!
//! # Responsibility
//! - Define the operations the core needs from entry storage.
//! - Provide an in-memory implementation for embedding and tests.
//!
//! # Invariants
//! - Entries are addressed by slug.
//! - `read_entry` reports a missing entry as [`StoreError::NotFound`].

use crate::model::entry::{Entry, EntryValidationError};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;

pub use memory::MemoryEntryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by entry storage.
#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    /// Another entry already owns this slug.
    Duplicate(String),
    Validation(EntryValidationError),
    /// Storage backend failed (I/O, decoding, lock poisoning).
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::Duplicate(id) => write!(f, "duplicate entry: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "entry storage failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) | Self::Duplicate(_) | Self::Backend(_) => None,
        }
    }
}

impl From<EntryValidationError> for StoreError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Authoritative entry storage consumed by the index and service layers.
pub trait EntryStore {
    /// Reads one entry by slug.
    fn read_entry(&self, id: &str) -> StoreResult<Entry>;
    /// Lists every stored slug in ascending order.
    fn list_ids(&self) -> StoreResult<BTreeSet<String>>;
    /// Creates or replaces the entry stored under `entry.slug()`.
    ///
    /// Fails with [`StoreError::Duplicate`] when that slug already belongs to
    /// an entry with a different display name.
    fn write_entry(&self, entry: &Entry) -> StoreResult<()>;
    /// Removes one entry.
    fn delete_entry(&self, id: &str) -> StoreResult<()>;
    /// Replaces the entry stored under `old_id` with `renamed`, stored under
    /// `renamed.slug()`.
    fn rename_entry(&self, old_id: &str, renamed: &Entry) -> StoreResult<()>;
}
