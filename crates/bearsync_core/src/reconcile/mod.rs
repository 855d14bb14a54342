//! Reconciliation between the Bear database and the export tree.
//!
//! # Responsibility
//! - Classify every store identity into an ordered group of actions.
//! - Apply action groups against both stores with per-identity isolation.
//!
//! # Invariants
//! - Planning is pure: it reads two snapshots and touches nothing.
//! - Identities present only in the tree are never acted upon.
//! - Within a group, relocation precedes content sync, which precedes the
//!   timestamp sync.

pub mod apply;
pub mod plan;

pub use apply::{apply_plan, ApplyReport, GroupFailure};
pub use plan::{reconcile, ActionGroup, ReconcilePlan, SyncAction};
