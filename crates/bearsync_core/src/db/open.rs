//! Connection bootstrap utilities for the Bear database.
//!
//! # Responsibility
//! - Open an existing database file, never creating a new one.
//! - Configure the busy timeout so Bear's own writes do not fail a pass.
//! - Verify the required schema before returning a usable connection.

use super::schema::ensure_bear_schema;
use super::DbResult;
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens an existing Bear database for reading and writing.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_bear_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with_flags(
        path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        "read_write",
    )
}

/// Opens an existing Bear database read-only, for dry runs.
pub fn open_bear_db_read_only(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with_flags(
        path.as_ref(),
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        "read_only",
    )
}

fn open_with_flags(path: &Path, flags: OpenFlags, mode: &str) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match Connection::open_with_flags(path, flags) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    ensure_bear_schema(conn)?;
    Ok(())
}
