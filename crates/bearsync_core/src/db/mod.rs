//! SQLite bootstrap for the Bear database.
//!
//! # Responsibility
//! - Open and configure connections to an existing Bear database.
//! - Validate the subset of Bear's schema that sync reads and writes.
//!
//! # Invariants
//! - The database is owned by Bear: it is never created or migrated here.
//! - Store code must not query application data before schema checks pass.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;

pub use open::{open_bear_db, open_bear_db_read_only};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// No `Z_<n>TAGS` note/tag link table was found.
    TagLinkTableNotFound,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "bear database is missing required table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "bear database table `{table}` is missing required column `{column}`"
            ),
            Self::TagLinkTableNotFound => {
                write!(f, "bear database has no note/tag link table")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
