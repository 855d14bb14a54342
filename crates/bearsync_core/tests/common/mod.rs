#![allow(dead_code)]

use bearsync_core::{store_to_system_time, system_time_to_store, StoreTime};
use filetime::FileTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Subset of Bear's Core Data schema that sync touches.
pub const BEAR_SCHEMA: &str = "
CREATE TABLE ZSFNOTE (
    Z_PK INTEGER PRIMARY KEY,
    ZTITLE VARCHAR,
    ZTEXT VARCHAR,
    ZMODIFICATIONDATE TIMESTAMP,
    ZTRASHED INTEGER,
    ZSKIPSYNC INTEGER
);
CREATE TABLE ZSFNOTETAG (
    Z_PK INTEGER PRIMARY KEY,
    ZTITLE VARCHAR
);
CREATE TABLE Z_5TAGS (
    Z_5NOTES INTEGER,
    Z_13TAGS INTEGER,
    PRIMARY KEY (Z_5NOTES, Z_13TAGS)
);
";

pub fn bear_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(BEAR_SCHEMA).unwrap();
    conn
}

pub fn insert_note(
    conn: &Connection,
    note_id: i64,
    title: &str,
    text: &str,
    modified_at: StoreTime,
    trashed: bool,
) {
    conn.execute(
        "INSERT INTO ZSFNOTE (Z_PK, ZTITLE, ZTEXT, ZMODIFICATIONDATE, ZTRASHED, ZSKIPSYNC)
         VALUES (?1, ?2, ?3, ?4, ?5, 0);",
        params![note_id, title, text, modified_at, i64::from(trashed)],
    )
    .unwrap();
}

/// Links `tag` to a note, creating the tag row on first use.
pub fn tag_note(conn: &Connection, note_id: i64, tag: &str) {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT Z_PK FROM ZSFNOTETAG WHERE ZTITLE = ?1;",
            [tag],
            |row| row.get(0),
        )
        .optional()
        .unwrap();
    let tag_id = match existing {
        Some(tag_id) => tag_id,
        None => {
            conn.execute("INSERT INTO ZSFNOTETAG (ZTITLE) VALUES (?1);", [tag])
                .unwrap();
            conn.last_insert_rowid()
        }
    };
    conn.execute(
        "INSERT INTO Z_5TAGS (Z_5NOTES, Z_13TAGS) VALUES (?1, ?2);",
        params![note_id, tag_id],
    )
    .unwrap();
}

/// Returns `(text, modification date)` for one note.
pub fn note_row(conn: &Connection, note_id: i64) -> (String, StoreTime) {
    conn.query_row(
        "SELECT ZTEXT, CAST(ZMODIFICATIONDATE AS REAL) FROM ZSFNOTE WHERE Z_PK = ?1;",
        [note_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .unwrap()
}

pub fn note_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM ZSFNOTE;", [], |row| row.get(0))
        .unwrap()
}

pub fn write_file(path: &Path, content: &str, modified_at: StoreTime) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
    set_mtime(path, modified_at);
}

pub fn set_mtime(path: &Path, modified_at: StoreTime) {
    let time = FileTime::from_system_time(store_to_system_time(modified_at));
    filetime::set_file_mtime(path, time).unwrap();
}

/// File mtime in store epoch.
pub fn file_store_time(path: &Path) -> StoreTime {
    let modified = std::fs::metadata(path).unwrap().modified().unwrap();
    system_time_to_store(modified)
}
