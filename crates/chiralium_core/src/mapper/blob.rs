//! Best-effort put/delete of blob entities keyed by `prefix + id`.
//!
//! # Responsibility
//! - Upload an entity's in-memory payload and hand ownership to the store.
//! - Remove an entity's object by key.
//!
//! # Invariants
//! - `put` and `delete` never return errors: failures are logged and
//!   reported as `false`. Unlike `RowMapper`, no cause reaches the caller.
//! - A successful `put` clears the in-memory payload; a failed one keeps it.
//! - A `put` without a payload is refused before the store is called.
//! - Prefix uniqueness across entity types is a naming convention only.

use crate::store::blob::BlobStore;
use crate::upload::{self, UploadHeaders, DEFAULT_MAXIMUM_FILE_SIZE_MB};
use log::{debug, warn};

/// Capability a concrete type implements to be stored by `BlobMapper`.
pub trait BlobEntity: Sized {
    /// Key prefix for this type. Must not be shared with another type in the
    /// same bucket.
    const PREFIX: &'static str;

    fn id(&self) -> &str;

    fn key(&self) -> String {
        format!("{}{}", Self::PREFIX, self.id())
    }

    /// Bytes not yet handed to the store, if any.
    fn payload(&self) -> Option<&[u8]>;

    /// Drops the in-memory bytes after the store took ownership of them.
    fn clear_payload(&mut self);

    /// Rebuilds the entity from its stored object, `None` when absent or
    /// unreadable.
    fn refresh(&self, bucket: &dyn BlobStore) -> Option<Self>;

    /// Accepted upload content types; `None` accepts any type.
    fn accepted_file_types() -> Option<&'static [&'static str]> {
        None
    }

    fn maximum_file_size_mb() -> u64 {
        DEFAULT_MAXIMUM_FILE_SIZE_MB
    }

    /// Whether an inbound upload with these headers may become a `Self`.
    fn check_validity(headers: &(impl UploadHeaders + ?Sized)) -> bool {
        upload::check_validity(
            headers,
            Self::accepted_file_types(),
            Self::maximum_file_size_mb(),
        )
    }
}

/// Runs `BlobEntity` operations against one bucket.
pub struct BlobMapper<'b> {
    bucket: &'b dyn BlobStore,
}

impl<'b> BlobMapper<'b> {
    pub fn new(bucket: &'b dyn BlobStore) -> Self {
        Self { bucket }
    }

    /// Uploads the entity payload under `entity.key()`.
    ///
    /// Returns `true` and clears the payload on success. Returns `false` when
    /// the store fails or when there is no payload to upload (for example on
    /// a second `put` after a successful one).
    pub fn put<T: BlobEntity>(&self, entity: &mut T) -> bool {
        let key = entity.key();
        let Some(payload) = entity.payload() else {
            warn!("event=blob_put module=mapper status=error key={key} error_code=payload_missing");
            return false;
        };
        let size = payload.len();

        match self.bucket.put(&key, payload) {
            Ok(()) => {
                entity.clear_payload();
                debug!("event=blob_put module=mapper status=ok key={key} bytes={size}");
                true
            }
            Err(err) => {
                warn!("event=blob_put module=mapper status=error key={key} error={err}");
                false
            }
        }
    }

    /// Removes the object at `entity.key()`. Missing objects count as removed.
    pub fn delete<T: BlobEntity>(&self, entity: &T) -> bool {
        let key = entity.key();
        match self.bucket.delete(&key) {
            Ok(()) => {
                debug!("event=blob_delete module=mapper status=ok key={key}");
                true
            }
            Err(err) => {
                warn!("event=blob_delete module=mapper status=error key={key} error={err}");
                false
            }
        }
    }

    pub fn refresh<T: BlobEntity>(&self, entity: &T) -> Option<T> {
        entity.refresh(self.bucket)
    }

    /// Reads the stored bytes for `entity`; store errors read as `None`.
    pub fn read<T: BlobEntity>(&self, entity: &T) -> Option<Vec<u8>> {
        read_key(self.bucket, &entity.key())
    }
}

/// Reads `key` from `bucket`, logging and swallowing store errors.
///
/// Intended for `BlobEntity::refresh` implementations.
pub fn read_key(bucket: &dyn BlobStore, key: &str) -> Option<Vec<u8>> {
    match bucket.get(key) {
        Ok(body) => body,
        Err(err) => {
            warn!("event=blob_read module=mapper status=error key={key} error={err}");
            None
        }
    }
}
