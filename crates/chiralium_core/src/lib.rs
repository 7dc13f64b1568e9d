//! Generic persistence helpers for application entities.
//!
//! Entities declare their shape (table and columns, or key prefix and
//! payload); the mappers supply insert/update/delete/refresh over a row store
//! and put/delete over a blob store.

pub mod config;
pub mod db;
pub mod id;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod store;
pub mod upload;

pub use config::CoreConfig;
pub use id::{resolve_id, IdGenerator, RandomIds, SequentialIds};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use mapper::blob::{read_key, BlobEntity, BlobMapper};
pub use mapper::row::{RowEntity, RowMapper, RowMapperError, RowMapperResult};
pub use model::column::{Column, ColumnValue};
pub use model::row::{ParseError, ParseResult, Row};
pub use store::blob::{BlobStore, BlobStoreError, MemoryBucket, SqliteBucket};
pub use store::row::{RowStore, SqliteRowStore, Statement, StoreError};
pub use upload::{check_validity, validate_upload, UploadHeaders, UploadRejection, UploadRequest};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
