//! Note and file records compared by the reconciler.
//!
//! # Invariants
//! - `org_path` is `/`-joined and relative; `""` is the export root.
//! - `modified_at` is always store-epoch seconds, on both record kinds.

use crate::codec::path_codec::{encode_file_name, relative_note_path};
use crate::model::timestamp::StoreTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Stable note identity shared by a Bear row (`Z_PK`) and its exported file.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = i64;

/// One note as read from the Bear database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteRecord {
    pub note_id: NoteId,
    /// Raw title, used only to derive the file name.
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Folder derived from the note's tag, `""` when untagged.
    pub org_path: String,
    pub modified_at: StoreTime,
    pub trashed: bool,
}

impl NoteRecord {
    /// File name this note is exported under.
    pub fn file_name(&self) -> String {
        encode_file_name(self.note_id, &self.title)
    }

    /// Path relative to the export root that this note should live at.
    pub fn relative_path(&self) -> PathBuf {
        relative_note_path(&self.org_path, &self.file_name())
    }
}

/// One managed file as read from the export tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub note_id: NoteId,
    pub file_name: String,
    /// Directory relative to the export root, `""` for the root itself.
    pub org_path: String,
    /// File mtime converted to store epoch.
    pub modified_at: StoreTime,
    pub content: String,
}

impl FileRecord {
    /// Current path relative to the export root.
    pub fn relative_path(&self) -> PathBuf {
        relative_note_path(&self.org_path, &self.file_name)
    }
}

/// Point-in-time view of the Bear database, keyed by identity.
pub type StoreSnapshot = BTreeMap<NoteId, NoteRecord>;
