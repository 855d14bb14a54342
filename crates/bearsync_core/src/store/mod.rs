//! Relational side of sync: contracts and the Bear implementation.
//!
//! # Responsibility
//! - Define the minimal contract the reconciler needs from the note database.
//! - Keep SQL details inside this boundary.
//!
//! # Invariants
//! - Only `content` and `modified_at` are ever written.
//! - Every write is a parameterized statement.
//! - Store errors are pass-level: callers stop applying actions on the first one.

use crate::db::DbError;
use crate::model::note::{NoteId, StoreSnapshot};
use crate::model::timestamp::StoreTime;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod bear_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while reading from or writing to the note database.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// An update targeted an identity that no longer exists.
    NotFound(NoteId),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found in store: {id}"),
            Self::InvalidData(message) => write!(f, "invalid note data in store: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Contract the sync core requires from the note database.
pub trait NoteStore {
    /// Reads every sync-eligible note, trashed ones included, one per identity.
    fn load_snapshot(&self) -> StoreResult<StoreSnapshot>;
    /// Replaces the body of one note.
    fn update_content(&self, note_id: NoteId, content: &str) -> StoreResult<()>;
    /// Sets the modification timestamp of one note, in store epoch.
    fn update_modified_at(&self, note_id: NoteId, modified_at: StoreTime) -> StoreResult<()>;
}
