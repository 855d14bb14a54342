//! File name and folder codec.
//!
//! Exported files are named `<title>_<id>.md`. The identity after the last
//! underscore is authoritative; the title part is cosmetic and may drift
//! without changing which note a file belongs to.

use crate::model::note::NoteId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Extension of every managed note file, including the dot.
pub const NOTE_EXTENSION: &str = ".md";

const MAX_FILE_NAME_BYTES: usize = 255;
const HIDDEN_PREFIX: char = '.';

static NOTE_FILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^.*_([0-9]+)\.md$").expect("valid note file name regex"));

/// Builds the exported file name for one note.
pub fn encode_file_name(note_id: NoteId, title: &str) -> String {
    let suffix = format!("_{note_id}{NOTE_EXTENSION}");
    let budget = MAX_FILE_NAME_BYTES.saturating_sub(suffix.len());
    let title = truncate_to_bytes(&sanitize_title(title), budget);
    format!("{title}{suffix}")
}

/// Recovers the note identity from a file name.
///
/// Returns `None` for hidden files, files without the note extension, and
/// names whose identity segment is not a decimal integer. Such files are not
/// managed by sync and must be left alone.
pub fn decode_file_name(file_name: &str) -> Option<NoteId> {
    if is_hidden_name(file_name) {
        return None;
    }
    let caps = NOTE_FILE_NAME_RE.captures(file_name)?;
    caps.get(1)?.as_str().parse::<NoteId>().ok()
}

/// Returns whether a directory entry name is hidden by platform convention.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Normalizes a Bear tag into a relative folder path.
///
/// Nested tags (`work/projects`) keep their nesting. Empty, `.` and `..`
/// segments are dropped and leading dots are stripped so a tag can never
/// escape the root or produce a hidden folder. Returns `""` for the root.
pub fn normalize_org_path(tag: &str) -> String {
    tag.split(['/', '\\'])
        .map(|segment| segment.trim().trim_start_matches(HIDDEN_PREFIX).trim())
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Converts a directory path relative to the export root into an org path.
///
/// Returns `None` when a component is not valid UTF-8 or is not a plain
/// directory name.
pub fn org_path_from_dir(relative_dir: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in relative_dir.components() {
        match component {
            Component::Normal(name) => segments.push(name.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments.join("/"))
}

/// Joins an org path and a file name into a path relative to the root.
pub fn relative_note_path(org_path: &str, file_name: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in org_path.split('/').filter(|segment| !segment.is_empty()) {
        path.push(segment);
    }
    path.push(file_name);
    path
}

fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    replaced
        .trim()
        .trim_start_matches(HIDDEN_PREFIX)
        .trim_start()
        .to_string()
}

fn truncate_to_bytes(value: &str, max_bytes: usize) -> String {
    if value.len() <= max_bytes {
        return value.to_string();
    }
    let mut end = 0;
    for (idx, ch) in value.char_indices() {
        let next = idx + ch.len_utf8();
        if next > max_bytes {
            break;
        }
        end = next;
    }
    value[..end].to_string()
}
