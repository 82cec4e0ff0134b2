//! Connection bootstrap for the index database.
//!
//! Every connection handed out has `foreign_keys=ON`, a busy timeout and a
//! fully migrated schema.

use super::migrations::{drop_index_objects, migrate};
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where an index database lives.
#[derive(Debug, Clone, Copy)]
pub enum DbLocation<'a> {
    File(&'a Path),
    Memory,
}

impl DbLocation<'_> {
    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::Memory => Connection::open_in_memory(),
        }
    }
}

/// Opens (creating if needed) the index file at `path`.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_at(DbLocation::File(path.as_ref()))
}

/// Opens a private in-memory index database.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_at(DbLocation::Memory)
}

/// Opens `location`, configures the connection and migrates it.
///
/// Logs one `db_open` event with `duration_ms` either way.
pub fn open_at(location: DbLocation<'_>) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = location.mode();

    let result = location
        .connect()
        .map_err(Into::into)
        .and_then(|mut conn| configure(&mut conn).map(|steps| (conn, steps)));

    match result {
        Ok((conn, steps)) => {
            info!(
                "event=db_open module=db status=ok mode={mode} migrated_steps={steps} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

/// Wipes the index schema and recreates it empty.
pub fn reset_schema(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    drop_index_objects(&tx)?;
    tx.commit()?;
    migrate(conn)?;
    info!("event=db_reset module=db status=ok");
    Ok(())
}

fn configure(conn: &mut Connection) -> DbResult<usize> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    migrate(conn)
}
