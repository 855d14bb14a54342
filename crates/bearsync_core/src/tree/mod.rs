//! Filesystem side of sync: the export tree.
//!
//! # Responsibility
//! - Snapshot managed note files under the export root.
//! - Perform the file mutations requested by the applier.
//! - Remove directories left empty after a pass.
//!
//! # Invariants
//! - Every path handed to `NoteTree` is relative and stays under the root.
//! - Writes replace whole files atomically (temp file + rename).
//! - Creating or relocating never replaces a file already at the target.
//! - Hidden entries are never read, written, or removed.

use crate::model::timestamp::{system_time_to_store, StoreTime};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

pub mod janitor;
pub mod snapshot;

pub use janitor::JanitorReport;
pub use snapshot::{ScanFailure, TreeSnapshot};

const TEMP_FILE_PREFIX: &str = ".bearsync-";
const TEMP_FILE_SUFFIX: &str = ".tmp";

pub type TreeResult<T> = Result<T, TreeError>;

/// Errors raised by export tree operations.
#[derive(Debug)]
pub enum TreeError {
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// Export root is missing or not a directory.
    InvalidRoot(PathBuf),
    /// A relative path would leave the export root.
    InvalidPath(PathBuf),
    /// Create or relocate target is already occupied.
    TargetExists(PathBuf),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { op, path, source } => {
                write!(f, "{op} failed for `{}`: {source}", path.display())
            }
            Self::InvalidRoot(path) => {
                write!(f, "export root is not a directory: `{}`", path.display())
            }
            Self::InvalidPath(path) => {
                write!(f, "path escapes export root: `{}`", path.display())
            }
            Self::TargetExists(path) => {
                write!(f, "target already exists: `{}`", path.display())
            }
        }
    }
}

impl Error for TreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidRoot(_) | Self::InvalidPath(_) | Self::TargetExists(_) => None,
        }
    }
}

pub(crate) fn io_error(op: &'static str, path: &Path) -> impl FnOnce(io::Error) -> TreeError {
    let path = path.to_path_buf();
    move |source| TreeError::Io { op, path, source }
}

/// Handle over the export root directory.
#[derive(Debug, Clone)]
pub struct NoteTree {
    root: PathBuf,
}

impl NoteTree {
    /// Opens the export root, creating it when absent.
    pub fn open(root: impl Into<PathBuf>) -> TreeResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_error("create_dir", &root))?;
        if !root.is_dir() {
            return Err(TreeError::InvalidRoot(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Builds a snapshot of every managed file under the root.
    pub fn snapshot(&self) -> TreeResult<TreeSnapshot> {
        snapshot::build_tree_snapshot(&self.root)
    }

    /// Writes a new file at `relative`, creating parents.
    ///
    /// # Errors
    /// - `TreeError::TargetExists` when a file is already there.
    pub fn create_note(&self, relative: &Path, content: &str) -> TreeResult<()> {
        let target = self.resolve(relative)?;
        self.write_atomic(&target, content, false)?;
        debug!(
            "event=tree_write module=tree status=ok mode=create path={} bytes={}",
            relative.display(),
            content.len()
        );
        Ok(())
    }

    /// Replaces the file at `relative` with `content`, creating parents.
    pub fn write_note(&self, relative: &Path, content: &str) -> TreeResult<()> {
        let target = self.resolve(relative)?;
        self.write_atomic(&target, content, true)?;
        debug!(
            "event=tree_write module=tree status=ok mode=replace path={} bytes={}",
            relative.display(),
            content.len()
        );
        Ok(())
    }

    /// Removes the file at `relative`.
    ///
    /// Returns `false` when the file was already absent.
    pub fn remove_note(&self, relative: &Path) -> TreeResult<bool> {
        let target = self.resolve(relative)?;
        let removed = match fs::remove_file(&target) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => return Err(io_error("remove", &target)(err)),
        };
        debug!(
            "event=tree_remove module=tree status=ok path={} removed={}",
            relative.display(),
            removed
        );
        Ok(removed)
    }

    /// Moves a file to a new relative path, creating the destination folder.
    ///
    /// Rename preserves mtime, so relocation never changes which side is newer.
    ///
    /// # Errors
    /// - `TreeError::TargetExists` when another file already sits at `to`.
    pub fn relocate_note(&self, from: &Path, to: &Path) -> TreeResult<()> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        if source == target {
            return Ok(());
        }
        match fs::symlink_metadata(&target) {
            Ok(_) => return Err(TreeError::TargetExists(target)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_error("stat", &target)(err)),
        }
        self.ensure_parent(&target)?;
        fs::rename(&source, &target).map_err(io_error("rename", &source))?;
        debug!(
            "event=tree_relocate module=tree status=ok from={} to={}",
            from.display(),
            to.display()
        );
        Ok(())
    }

    /// Returns the file's mtime in store epoch.
    pub fn modified_at(&self, relative: &Path) -> TreeResult<StoreTime> {
        let target = self.resolve(relative)?;
        let modified = fs::metadata(&target)
            .and_then(|meta| meta.modified())
            .map_err(io_error("stat", &target))?;
        Ok(system_time_to_store(modified))
    }

    /// Removes directories left empty under the root.
    pub fn prune_empty_dirs(&self) -> TreeResult<JanitorReport> {
        janitor::prune_empty_dirs(&self.root)
    }

    /// Writes `content` to a hidden temp file in the destination directory
    /// and renames it over `target`, so a concurrent reader sees either the
    /// old or the new body.
    fn write_atomic(&self, target: &Path, content: &str, replace: bool) -> TreeResult<()> {
        let parent = self.ensure_parent(target)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(TEMP_FILE_SUFFIX)
            .tempfile_in(&parent)
            .map_err(io_error("create_temp", &parent))?;
        tmp.write_all(content.as_bytes())
            .map_err(io_error("write", target))?;
        tmp.as_file()
            .sync_all()
            .map_err(io_error("sync", target))?;
        let persisted = if replace {
            tmp.persist(target)
        } else {
            tmp.persist_noclobber(target)
        };
        match persisted {
            Ok(_) => Ok(()),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(TreeError::TargetExists(target.to_path_buf()))
            }
            Err(err) => Err(io_error("persist", target)(err.error)),
        }
    }

    fn resolve(&self, relative: &Path) -> TreeResult<PathBuf> {
        let is_plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain || relative.as_os_str().is_empty() {
            return Err(TreeError::InvalidPath(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }

    fn ensure_parent(&self, target: &Path) -> TreeResult<PathBuf> {
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent).map_err(io_error("create_dir", &parent))?;
        Ok(parent)
    }
}
