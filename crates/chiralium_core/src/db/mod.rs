//! SQLite connection bootstrap for the bundled row store.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by `SqliteRowStore` and
//!   `SqliteBucket`.
//!
//! # Invariants
//! - Table layout is owned by the application; nothing here creates or
//!   migrates application tables.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A text value read back from SQLite was not valid UTF-8.
    InvalidText { column: String },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidText { column } => {
                write!(f, "column `{column}` holds text that is not valid UTF-8")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidText { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
