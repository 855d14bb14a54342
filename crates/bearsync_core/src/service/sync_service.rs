//! One reconciliation pass: snapshot, plan, apply, prune.
//!
//! # Responsibility
//! - Own the store and tree handles for the lifetime of the service.
//! - Expose an idempotent `run_pass` for an external scheduler.
//!
//! # Invariants
//! - Passes never overlap: re-entering `run_pass` while one is running fails
//!   with `SyncError::PassInProgress`.
//! - A store error aborts the pass before the janitor runs.

use crate::reconcile::{apply_plan, reconcile, ApplyReport, ReconcilePlan};
use crate::store::{NoteStore, StoreError};
use crate::tree::{NoteTree, TreeError};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Pass-level failure surfaced to the scheduler.
#[derive(Debug)]
pub enum SyncError {
    Store(StoreError),
    Tree(TreeError),
    PassInProgress,
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::Tree(err) => write!(f, "export tree error: {err}"),
            Self::PassInProgress => write!(f, "a sync pass is already running"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Tree(err) => Some(err),
            Self::PassInProgress => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TreeError> for SyncError {
    fn from(value: TreeError) -> Self {
        Self::Tree(value)
    }
}

/// Summary of one completed pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassReport {
    pub store_notes: usize,
    pub tree_files: usize,
    /// Managed-looking files with no store record.
    pub untracked: usize,
    /// Tree entries skipped as unreadable or duplicated.
    pub scan_failures: usize,
    /// Store notes left alone because their file could not be read.
    pub held: usize,
    pub planned_actions: usize,
    pub applied: ApplyReport,
    pub pruned_dirs: usize,
    pub duration_ms: u128,
}

/// Sync service facade over a note store and an export tree.
pub struct SyncService<S: NoteStore> {
    store: S,
    tree: NoteTree,
    in_progress: AtomicBool,
}

impl<S: NoteStore> SyncService<S> {
    /// Creates a service from explicit store and tree handles.
    pub fn new(store: S, tree: NoteTree) -> Self {
        Self {
            store,
            tree,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tree(&self) -> &NoteTree {
        &self.tree
    }

    /// Computes the plan a pass would apply, without mutating anything.
    pub fn plan(&self) -> Result<ReconcilePlan, SyncError> {
        let _guard = PassGuard::acquire(&self.in_progress)?;
        let store_snapshot = self.store.load_snapshot()?;
        let tree_snapshot = self.tree.snapshot()?;
        Ok(reconcile(&store_snapshot, &tree_snapshot))
    }

    /// Runs one full pass.
    ///
    /// # Errors
    /// - `SyncError::Store` when the snapshot query or any store update fails.
    /// - `SyncError::Tree` when the export root is unusable.
    /// - `SyncError::PassInProgress` when called re-entrantly.
    pub fn run_pass(&self) -> Result<PassReport, SyncError> {
        let _guard = PassGuard::acquire(&self.in_progress)?;
        let started_at = Instant::now();
        info!("event=sync_pass module=sync status=start");

        match self.run_pass_inner(started_at) {
            Ok(report) => {
                info!(
                    "event=sync_pass module=sync status=ok notes={} files={} untracked={} planned={} mutations={} failed_groups={} pruned_dirs={} duration_ms={}",
                    report.store_notes,
                    report.tree_files,
                    report.untracked,
                    report.planned_actions,
                    report.applied.mutation_count(),
                    report.applied.failed.len(),
                    report.pruned_dirs,
                    report.duration_ms
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=sync_pass module=sync status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn run_pass_inner(&self, started_at: Instant) -> Result<PassReport, SyncError> {
        let store_snapshot = self.store.load_snapshot()?;
        let tree_snapshot = self.tree.snapshot()?;

        let plan = reconcile(&store_snapshot, &tree_snapshot);
        if !plan.untracked.is_empty() {
            warn!(
                "event=reconcile_plan module=sync status=skip untracked={} note_ids={:?}",
                plan.untracked.len(),
                plan.untracked
            );
        }
        if !plan.held.is_empty() {
            warn!(
                "event=reconcile_plan module=sync status=skip held={} note_ids={:?}",
                plan.held.len(),
                plan.held
            );
        }
        info!(
            "event=reconcile_plan module=sync status=ok groups={} actions={}",
            plan.groups.len(),
            plan.action_count()
        );

        let applied = apply_plan(&plan, &self.store, &self.tree)?;
        let janitor = self.tree.prune_empty_dirs()?;

        Ok(PassReport {
            store_notes: store_snapshot.len(),
            tree_files: tree_snapshot.files.len(),
            untracked: plan.untracked.len(),
            scan_failures: tree_snapshot.failures.len(),
            held: plan.held.len(),
            planned_actions: plan.action_count(),
            applied,
            pruned_dirs: janitor.removed.len(),
            duration_ms: started_at.elapsed().as_millis(),
        })
    }
}

struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SyncError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::PassInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
