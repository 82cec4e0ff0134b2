//! Searchable entry index.
//!
//! # Responsibility
//! - Project entries into a SQLite/FTS5 index and query them back.
//! - Compose boolean filters, sort, paginate and count results.
//!
//! # Invariants
//! - The index is derived data: it can always be rebuilt from the entry store.
//! - Index lookups report "not found" as `None`, never as an error.

use crate::db::DbError;
use crate::store::StoreError;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod engine;
pub mod pager;
pub mod projection;
pub mod query;

pub type IndexResult<T> = Result<T, IndexError>;

/// Index-layer error for storage, store and decoding failures.
#[derive(Debug)]
pub enum IndexError {
    Db(DbError),
    /// Entry storage failed in a way that aborts the whole call.
    Store(StoreError),
    /// Full-text expression rejected by SQLite.
    InvalidQuery { query: String, message: String },
    /// Persisted row cannot be decoded into an indexed entry.
    InvalidData(String),
    Json(serde_json::Error),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid search query `{query}`: {message}")
            }
            Self::InvalidData(message) => write!(f, "invalid index row: {message}"),
            Self::Json(err) => write!(f, "invalid custom fields: {err}"),
        }
    }
}

impl Error for IndexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::InvalidQuery { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for IndexError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for IndexError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<StoreError> for IndexError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Tunables for projection and paging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Character budget for stored description excerpts.
    pub excerpt_chars: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Relevance weight of a name match relative to a body-only match.
    pub name_boost: u32,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            excerpt_chars: 200,
            default_page_size: 10,
            max_page_size: 100,
            name_boost: 5,
        }
    }
}

impl IndexOptions {
    /// Normalizes a requested page size: zero/absent uses the default and
    /// large values clamp to the maximum.
    pub fn normalize_page_size(&self, page_size: Option<u32>) -> u32 {
        match page_size {
            Some(0) | None => self.default_page_size.max(1),
            Some(value) => value.min(self.max_page_size.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IndexOptions;

    #[test]
    fn page_size_defaults_and_clamps() {
        let options = IndexOptions::default();
        assert_eq!(options.normalize_page_size(None), 10);
        assert_eq!(options.normalize_page_size(Some(0)), 10);
        assert_eq!(options.normalize_page_size(Some(25)), 25);
        assert_eq!(options.normalize_page_size(Some(5000)), 100);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: IndexOptions = serde_json::from_str(r#"{"excerpt_chars": 80}"#).unwrap();
        assert_eq!(options.excerpt_chars, 80);
        assert_eq!(options.default_page_size, 10);
        assert_eq!(options.name_boost, 5);
    }
}
