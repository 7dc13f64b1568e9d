//! External store collaborators.
//!
//! # Responsibility
//! - Define the contracts the mappers need from a row store and a blob store.
//! - Ship SQLite/in-memory implementations of both.
//!
//! # Invariants
//! - Collaborators never retry; every failure is returned to the caller.

pub mod blob;
pub mod row;
