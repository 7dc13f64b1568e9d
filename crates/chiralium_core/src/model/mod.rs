//! Value model shared by the row and blob mappers.
//!
//! # Responsibility
//! - Define the scalar domain entities declare their columns in.
//! - Define the fetched-row shape parse functions read from.
//!
//! # Invariants
//! - A declared structure is an ordered list; fetched rows are keyed maps.

pub mod column;
pub mod row;
