//! Core sync logic between Bear's note database and a markdown export tree.
//! This crate is the single source of truth for reconciliation invariants.

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod tree;

pub use codec::path_codec::{decode_file_name, encode_file_name, normalize_org_path};
pub use config::{ConfigError, SyncConfig};
pub use db::{open_bear_db, open_bear_db_read_only, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{FileRecord, NoteId, NoteRecord, StoreSnapshot};
pub use model::timestamp::{
    store_to_system_time, system_time_to_store, StoreTime, CORE_DATA_EPOCH_OFFSET_SECS,
};
pub use reconcile::{apply_plan, reconcile, ActionGroup, ApplyReport, ReconcilePlan, SyncAction};
pub use service::sync_service::{PassReport, SyncError, SyncService};
pub use store::bear_store::SqliteBearStore;
pub use store::{NoteStore, StoreError, StoreResult};
pub use tree::{JanitorReport, NoteTree, TreeError, TreeSnapshot};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
