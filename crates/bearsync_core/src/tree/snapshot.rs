//! Export tree snapshot builder.
//!
//! # Invariants
//! - Only files whose name decodes to a `NoteId` are recorded.
//! - One unreadable file never aborts the walk; it is reported instead.
//! - An identity with an unreadable copy lands in `unreadable`, never in
//!   `files`, so it cannot be mistaken for a missing file.
//! - When an identity appears twice, the first path in sorted walk order wins.

use crate::codec::path_codec::{decode_file_name, is_hidden_name, org_path_from_dir};
use crate::model::note::{FileRecord, NoteId};
use crate::model::timestamp::{system_time_to_store, StoreTime};
use crate::tree::{io_error, TreeError, TreeResult};
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

/// Point-in-time view of the export tree, keyed by identity.
#[derive(Debug, Default)]
pub struct TreeSnapshot {
    pub files: BTreeMap<NoteId, FileRecord>,
    /// Entries that looked managed but could not be read.
    pub failures: Vec<ScanFailure>,
    /// Identities seen in the tree whose file could not be read this pass.
    pub unreadable: BTreeSet<NoteId>,
    /// Set when a directory could not be listed. Absence from `files` then
    /// proves nothing about an identity.
    pub partial: bool,
    /// Count of files skipped because their name is not a managed note.
    pub ignored: usize,
}

/// One entry skipped during a tree walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Walks `root` and records every managed note file.
///
/// # Errors
/// - Returns `TreeError::InvalidRoot` when `root` is not a directory.
pub fn build_tree_snapshot(root: &Path) -> TreeResult<TreeSnapshot> {
    let started_at = Instant::now();
    if !root.is_dir() {
        return Err(TreeError::InvalidRoot(root.to_path_buf()));
    }

    let mut snapshot = TreeSnapshot::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden_entry(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                match path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(decode_file_name)
                {
                    Some(note_id) => {
                        snapshot.unreadable.insert(note_id);
                    }
                    None => snapshot.partial = true,
                }
                record_failure(&mut snapshot, path, err.to_string());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(note_id) = entry.file_name().to_str().and_then(decode_file_name) else {
            snapshot.ignored += 1;
            continue;
        };

        let path = entry.path();
        let org_path = path
            .parent()
            .and_then(|dir| dir.strip_prefix(root).ok())
            .and_then(org_path_from_dir);
        let Some(org_path) = org_path else {
            snapshot.unreadable.insert(note_id);
            record_failure(
                &mut snapshot,
                path.to_path_buf(),
                "folder name is not valid UTF-8".to_string(),
            );
            continue;
        };

        if let Some(existing) = snapshot.files.get(&note_id) {
            let reason = format!(
                "duplicate identity {note_id}, already tracked at `{}`",
                existing.relative_path().display()
            );
            record_failure(&mut snapshot, path.to_path_buf(), reason);
            continue;
        }

        match read_note_file(path) {
            Ok((modified_at, content)) => {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                snapshot.files.insert(
                    note_id,
                    FileRecord {
                        note_id,
                        file_name,
                        org_path,
                        modified_at,
                        content,
                    },
                );
            }
            Err(err) => {
                snapshot.unreadable.insert(note_id);
                record_failure(&mut snapshot, path.to_path_buf(), err.to_string());
            }
        }
    }

    // A readable duplicate must not stand in for an unreadable copy.
    for note_id in &snapshot.unreadable {
        snapshot.files.remove(note_id);
    }

    info!(
        "event=tree_snapshot module=tree status=ok files={} ignored={} failures={} unreadable={} partial={} duration_ms={}",
        snapshot.files.len(),
        snapshot.ignored,
        snapshot.failures.len(),
        snapshot.unreadable.len(),
        snapshot.partial,
        started_at.elapsed().as_millis()
    );
    Ok(snapshot)
}

pub(crate) fn is_hidden_entry(entry: &DirEntry) -> bool {
    // The root itself may live under a hidden directory (temp dirs do).
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map_or(false, is_hidden_name)
}

/// Reads mtime before content: a write racing the read then shows up as a
/// newer mtime on the next pass instead of being masked.
fn read_note_file(path: &Path) -> TreeResult<(StoreTime, String)> {
    let mut file = File::open(path).map_err(io_error("open", path))?;
    let modified = file
        .metadata()
        .and_then(|meta| meta.modified())
        .map_err(io_error("stat", path))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(io_error("read", path))?;
    Ok((system_time_to_store(modified), content))
}

fn record_failure(snapshot: &mut TreeSnapshot, path: PathBuf, reason: String) {
    warn!(
        "event=tree_scan_skip module=tree status=skip path={} reason={}",
        path.display(),
        reason
    );
    snapshot.failures.push(ScanFailure { path, reason });
}
