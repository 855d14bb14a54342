//! Bear schema probes.
//!
//! Bear is a Core Data app, so its tables carry `Z`-prefixed names and the
//! note/tag many-to-many link table is numbered (`Z_5TAGS`, `Z_7TAGS`, ...)
//! depending on the app version. Everything here is read-only.

use super::{DbError, DbResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;

pub const NOTE_TABLE: &str = "ZSFNOTE";
pub const TAG_TABLE: &str = "ZSFNOTETAG";

const NOTE_COLUMNS: [&str; 6] = [
    "Z_PK",
    "ZTITLE",
    "ZTEXT",
    "ZMODIFICATIONDATE",
    "ZTRASHED",
    "ZSKIPSYNC",
];
const TAG_COLUMNS: [&str; 2] = ["Z_PK", "ZTITLE"];

static TAG_LINK_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Z_[0-9]+TAGS$").expect("valid tag link table regex"));
static TAG_LINK_NOTE_COLUMN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Z_[0-9]+NOTES$").expect("valid tag link note column regex"));

/// Resolved names of the note/tag link table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLinkSchema {
    pub table: String,
    pub note_column: String,
    pub tag_column: String,
}

/// Verifies the tables and columns sync depends on and resolves the link table.
pub fn ensure_bear_schema(conn: &Connection) -> DbResult<TagLinkSchema> {
    ensure_table(conn, NOTE_TABLE, &NOTE_COLUMNS)?;
    ensure_table(conn, TAG_TABLE, &TAG_COLUMNS)?;
    detect_tag_link(conn)
}

/// Finds the note/tag link table and its two foreign-key columns.
///
/// When several candidates exist the lexicographically first one wins so the
/// choice is stable across passes.
pub fn detect_tag_link(conn: &Connection) -> DbResult<TagLinkSchema> {
    let mut stmt = conn.prepare(
        "SELECT name
         FROM sqlite_master
         WHERE type = 'table'
         ORDER BY name ASC;",
    )?;
    let mut rows = stmt.query([])?;
    let mut candidates = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        if TAG_LINK_TABLE_RE.is_match(&name) {
            candidates.push(name);
        }
    }

    for table in candidates {
        let columns = table_columns(conn, &table)?;
        let note_column = columns
            .iter()
            .find(|column| TAG_LINK_NOTE_COLUMN_RE.is_match(column.as_str()));
        let tag_column = columns
            .iter()
            .find(|column| TAG_LINK_TABLE_RE.is_match(column.as_str()));
        if let (Some(note_column), Some(tag_column)) = (note_column, tag_column) {
            return Ok(TagLinkSchema {
                note_column: note_column.clone(),
                tag_column: tag_column.clone(),
                table,
            });
        }
    }

    Err(DbError::TagLinkTableNotFound)
}

fn ensure_table(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> DbResult<()> {
    if !table_exists(conn, table)? {
        return Err(DbError::MissingRequiredTable(table));
    }
    let present = table_columns(conn, table)?;
    for &column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(DbError::MissingRequiredColumn { table, column });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
    // Table names come from sqlite_master or constants, never from user input.
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\");"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
