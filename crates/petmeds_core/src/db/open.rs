//! Connection opening for the document store.
//!
//! File databases run in WAL mode so pooled readers do not wait on the single
//! `BEGIN IMMEDIATE` writer. The busy timeout is set before anything else
//! touches the file, so a connection opened while another one holds the write
//! lock waits instead of failing.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    File,
    Memory,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens (creating if needed) a database file and migrates it.
pub fn open_db(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with(Mode::File, busy_timeout, || Connection::open(path))
}

/// Opens a private in-memory database and migrates it.
pub fn open_db_in_memory(busy_timeout: Duration) -> DbResult<Connection> {
    open_with(Mode::Memory, busy_timeout, Connection::open_in_memory)
}

fn open_with(
    mode: Mode,
    busy_timeout: Duration,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    let opened: DbResult<Connection> = connect().map_err(DbError::from).and_then(|mut conn| {
        prepare_connection(&mut conn, mode, busy_timeout)?;
        Ok(conn)
    });

    match &opened {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} busy_timeout_ms={} duration_ms={}",
            mode.as_str(),
            busy_timeout.as_millis(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            mode.as_str(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    opened
}

fn prepare_connection(conn: &mut Connection, mode: Mode, busy_timeout: Duration) -> DbResult<()> {
    conn.busy_timeout(busy_timeout)?;
    if mode == Mode::File {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    apply_migrations(conn)
}
