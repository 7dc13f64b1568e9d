//! Generic persistence helpers for application entities.
//!
//! # Responsibility
//! - `row`: fail-loudly CRUD over a row store.
//! - `blob`: best-effort put/delete over a blob store.
//!
//! # Invariants
//! - The two error conventions stay separate: row operations return
//!   `Result`, blob mutations return `bool`.
//! - Neither mapper depends on the other.

pub mod blob;
pub mod row;
