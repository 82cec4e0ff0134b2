//! SQLite plumbing for the entry index.
//!
//! The index database holds derived data only. It is versioned through
//! `PRAGMA user_version` and is dropped and recreated rather than repaired.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{schema_version, SCHEMA_VERSION};
pub use open::{open_at, open_db, open_db_in_memory, reset_schema, DbLocation};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating the index database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build; it is never downgraded.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "index database error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "index schema v{found} is newer than this build understands (v{supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
