//! Post-pass cleanup of empty export folders.
//!
//! # Invariants
//! - The export root is never removed.
//! - Hidden directories are neither entered nor removed.
//! - Children are visited before parents, so a parent emptied by the removal
//!   of its children is removed in the same run.

use crate::tree::snapshot::is_hidden_entry;
use crate::tree::{TreeError, TreeResult};
use log::{info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Outcome of one prune run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JanitorReport {
    /// Removed directories, relative to the root, deepest first.
    pub removed: Vec<PathBuf>,
    /// Directories that could not be inspected or removed.
    pub failures: usize,
}

/// Removes every empty directory under `root`, bottom-up.
pub fn prune_empty_dirs(root: &Path) -> TreeResult<JanitorReport> {
    if !root.is_dir() {
        return Err(TreeError::InvalidRoot(root.to_path_buf()));
    }

    let mut report = JanitorReport::default();
    let mut dirs = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden_entry(entry));
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => {
                warn!(
                    "event=janitor_prune module=tree status=skip error={}",
                    err
                );
                report.failures += 1;
            }
        }
    }

    // Pre-order reversed: every child precedes its parent.
    for dir in dirs.iter().rev() {
        match remove_if_empty(dir) {
            Ok(true) => {
                let relative = dir.strip_prefix(root).unwrap_or(dir).to_path_buf();
                report.removed.push(relative);
            }
            Ok(false) => {}
            Err(err) => {
                warn!(
                    "event=janitor_prune module=tree status=skip path={} error={}",
                    dir.display(),
                    err
                );
                report.failures += 1;
            }
        }
    }

    if !report.removed.is_empty() || report.failures > 0 {
        info!(
            "event=janitor_prune module=tree status=ok removed={} failures={}",
            report.removed.len(),
            report.failures
        );
    }
    Ok(report)
}

fn remove_if_empty(dir: &Path) -> io::Result<bool> {
    if fs::read_dir(dir)?.next().is_some() {
        return Ok(false);
    }
    match fs::remove_dir(dir) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
