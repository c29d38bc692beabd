//! Opal Core - Core types and schema definitions for the Opal object database.
//!
//! This crate provides the foundational types for Opal's dynamic data-access
//! layer:
//!
//! - `ColumnType`: the closed set of storage types a column can hold
//! - `Value`: scalar cell values with per-type defaults
//! - `TableSpec` / `ColumnSpec`: the recursive table-shape model with
//!   structural equality
//! - `Error`: error types for data-access operations
//!
//! # Example
//!
//! ```rust
//! use opal_core::{ColumnType, TableSpec};
//!
//! let mut spec = TableSpec::new();
//! spec.add_column(ColumnType::String, "name");
//! spec.add_column(ColumnType::Integer, "age");
//!
//! let mut same = TableSpec::new();
//! same.add_column(ColumnType::String, "name");
//! same.add_column(ColumnType::Integer, "age");
//!
//! // Equality is structural, not identity-based.
//! assert_eq!(spec, same);
//! assert_eq!(spec.column_index("age"), Some(1));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod spec;
mod types;
mod value;

pub use error::{Error, Result};
pub use spec::{ColumnSpec, TableSpec};
pub use types::ColumnType;
pub use value::Value;
