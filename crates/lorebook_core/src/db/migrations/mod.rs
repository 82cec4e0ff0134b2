//! Embedded index schema steps.
//!
//! Steps run in ascending `version` order inside one transaction, and the
//! highest applied version is written back to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction};

struct SchemaStep {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const STEPS: [SchemaStep; 2] = [
    SchemaStep {
        version: 1,
        label: "entries",
        sql: include_str!("0001_entries.sql"),
    },
    SchemaStep {
        version: 2,
        label: "entry_links",
        sql: include_str!("0002_entry_links.sql"),
    },
];

/// Schema version produced by this build.
pub const SCHEMA_VERSION: u32 = STEPS[STEPS.len() - 1].version;

// Dependents first so foreign keys never block the drop.
const INDEX_OBJECTS: [&str; 5] = [
    "entries_fts",
    "entry_backlinks",
    "entry_links",
    "entry_tags",
    "entries",
];

/// Reads the schema version stamped on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` up to [`SCHEMA_VERSION`]. Returns how many steps ran.
///
/// # Errors
/// - [`DbError::SchemaTooNew`] when the database is ahead of this build.
pub fn migrate(conn: &mut Connection) -> DbResult<usize> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    let pending: Vec<&SchemaStep> = STEPS.iter().filter(|step| step.version > found).collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} label={}",
            step.version, step.label
        );
    }
    tx.commit()?;
    Ok(pending.len())
}

/// Drops every index table and clears the version stamp.
pub(crate) fn drop_index_objects(tx: &Transaction<'_>) -> DbResult<()> {
    for object in INDEX_OBJECTS {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {object};"))?;
    }
    tx.pragma_update(None, "user_version", 0)?;
    Ok(())
}
