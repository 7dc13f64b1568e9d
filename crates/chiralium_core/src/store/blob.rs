//! Blob store collaborator contract and bundled buckets.
//!
//! # Responsibility
//! - Describe the "put bytes at key / read key / delete key" surface the
//!   blob mapper needs.
//! - Provide an in-process bucket and a SQLite-backed bucket.
//!
//! # Invariants
//! - Keys are opaque; prefixes are a caller convention.
//! - Deleting a missing key succeeds.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

#[derive(Debug)]
pub enum BlobStoreError {
    Db(DbError),
    Backend(String),
}

impl Display for BlobStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "{message}"),
        }
    }
}

impl Error for BlobStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Backend(_) => None,
        }
    }
}

impl From<rusqlite::Error> for BlobStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key/blob store the blob mapper talks to.
pub trait BlobStore {
    fn put(&self, key: &str, body: &[u8]) -> BlobStoreResult<()>;
    fn get(&self, key: &str) -> BlobStoreResult<Option<Vec<u8>>>;
    fn delete(&self, key: &str) -> BlobStoreResult<()>;
}

/// In-process bucket.
#[derive(Debug, Default)]
pub struct MemoryBucket {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map_or(0, |objects| objects.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .map_or(false, |objects| objects.contains_key(key))
    }

    fn with_objects<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> T,
    ) -> BlobStoreResult<T> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| BlobStoreError::Backend("memory bucket lock poisoned".to_string()))?;
        Ok(f(&mut objects))
    }
}

impl BlobStore for MemoryBucket {
    fn put(&self, key: &str, body: &[u8]) -> BlobStoreResult<()> {
        self.with_objects(|objects| {
            objects.insert(key.to_string(), body.to_vec());
        })
    }

    fn get(&self, key: &str) -> BlobStoreResult<Option<Vec<u8>>> {
        self.with_objects(|objects| objects.get(key).cloned())
    }

    fn delete(&self, key: &str) -> BlobStoreResult<()> {
        self.with_objects(|objects| {
            objects.remove(key);
        })
    }
}

const CREATE_OBJECTS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS blob_objects (
    key TEXT PRIMARY KEY NOT NULL,
    body BLOB NOT NULL
);";

/// Bucket whose objects live in the `blob_objects` table of a SQLite database.
pub struct SqliteBucket<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBucket<'conn> {
    /// Wraps `conn`, creating the objects table when it does not exist yet.
    pub fn try_new(conn: &'conn Connection) -> BlobStoreResult<Self> {
        conn.execute_batch(CREATE_OBJECTS_TABLE_SQL)?;
        Ok(Self { conn })
    }
}

impl BlobStore for SqliteBucket<'_> {
    fn put(&self, key: &str, body: &[u8]) -> BlobStoreResult<()> {
        self.conn.execute(
            "INSERT INTO blob_objects (key, body) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body;",
            params![key, body],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> BlobStoreResult<Option<Vec<u8>>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM blob_objects WHERE key = ?1;",
                [key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn delete(&self, key: &str) -> BlobStoreResult<()> {
        self.conn
            .execute("DELETE FROM blob_objects WHERE key = ?1;", [key])?;
        Ok(())
    }
}
