//! SQLite-backed note store over Bear's Core Data schema.
//!
//! # Invariants
//! - Notes flagged `ZSKIPSYNC` are invisible to sync.
//! - A note with several tags is filed under the longest tag title; ties go
//!   to the lexicographically smallest title.
//! - `NULL` title/text/tag values read as empty strings.

use crate::codec::path_codec::normalize_org_path;
use crate::db::schema::{ensure_bear_schema, TagLinkSchema, NOTE_TABLE, TAG_TABLE};
use crate::model::note::{NoteId, NoteRecord, StoreSnapshot};
use crate::model::timestamp::StoreTime;
use crate::store::{NoteStore, StoreError, StoreResult};
use log::{error, info};
use rusqlite::{params, Connection, Row};
use std::time::Instant;

/// Note store bound to one Bear database connection.
pub struct SqliteBearStore<'conn> {
    conn: &'conn Connection,
    snapshot_sql: String,
}

impl<'conn> SqliteBearStore<'conn> {
    /// Constructs a store after validating the Bear schema.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let tag_link = ensure_bear_schema(conn)?;
        Ok(Self {
            conn,
            snapshot_sql: build_snapshot_sql(&tag_link),
        })
    }
}

impl NoteStore for SqliteBearStore<'_> {
    fn load_snapshot(&self) -> StoreResult<StoreSnapshot> {
        let started_at = Instant::now();
        let result = self.query_snapshot();
        match &result {
            Ok(snapshot) => info!(
                "event=store_snapshot module=store status=ok notes={} trashed={} duration_ms={}",
                snapshot.len(),
                snapshot.values().filter(|note| note.trashed).count(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=store_snapshot module=store status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn update_content(&self, note_id: NoteId, content: &str) -> StoreResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE {NOTE_TABLE} SET ZTEXT = ?2 WHERE Z_PK = ?1;"),
            params![note_id, content],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(note_id));
        }
        info!(
            "event=store_update module=store status=ok field=content note_id={} bytes={}",
            note_id,
            content.len()
        );
        Ok(())
    }

    fn update_modified_at(&self, note_id: NoteId, modified_at: StoreTime) -> StoreResult<()> {
        if !modified_at.is_finite() {
            return Err(StoreError::InvalidData(format!(
                "non-finite modification date for note {note_id}"
            )));
        }
        let changed = self.conn.execute(
            &format!("UPDATE {NOTE_TABLE} SET ZMODIFICATIONDATE = ?2 WHERE Z_PK = ?1;"),
            params![note_id, modified_at],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(note_id));
        }
        info!(
            "event=store_update module=store status=ok field=modified_at note_id={} modified_at={}",
            note_id, modified_at
        );
        Ok(())
    }
}

impl SqliteBearStore<'_> {
    fn query_snapshot(&self) -> StoreResult<StoreSnapshot> {
        let mut stmt = self.conn.prepare(&self.snapshot_sql)?;
        let mut rows = stmt.query([])?;
        let mut snapshot = StoreSnapshot::new();
        while let Some(row) = rows.next()? {
            let note = parse_note_row(row)?;
            if snapshot.insert(note.note_id, note).is_some() {
                return Err(StoreError::InvalidData(
                    "snapshot query returned duplicate identities".to_string(),
                ));
            }
        }
        Ok(snapshot)
    }
}

fn build_snapshot_sql(tag_link: &TagLinkSchema) -> String {
    format!(
        "SELECT
            n.Z_PK AS note_id,
            COALESCE(n.ZTITLE, '') AS title,
            COALESCE(n.ZTEXT, '') AS content,
            CAST(COALESCE(n.ZMODIFICATIONDATE, 0) AS REAL) AS modified_at,
            COALESCE(n.ZTRASHED, 0) AS trashed,
            (
                SELECT t.ZTITLE
                FROM \"{link}\" l
                INNER JOIN {TAG_TABLE} t ON t.Z_PK = l.\"{tag_column}\"
                WHERE l.\"{note_column}\" = n.Z_PK
                  AND t.ZTITLE IS NOT NULL
                ORDER BY LENGTH(t.ZTITLE) DESC, t.ZTITLE ASC
                LIMIT 1
            ) AS tag_path
         FROM {NOTE_TABLE} n
         WHERE COALESCE(n.ZSKIPSYNC, 0) = 0
         ORDER BY n.Z_PK ASC;",
        link = tag_link.table,
        tag_column = tag_link.tag_column,
        note_column = tag_link.note_column,
    )
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<NoteRecord> {
    let tag_path: Option<String> = row.get("tag_path")?;
    let trashed: i64 = row.get("trashed")?;
    Ok(NoteRecord {
        note_id: row.get("note_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        org_path: tag_path
            .as_deref()
            .map(normalize_org_path)
            .unwrap_or_default(),
        modified_at: row.get("modified_at")?,
        trashed: trashed != 0,
    })
}
