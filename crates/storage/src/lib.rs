//! Opal Storage - In-memory columnar storage for the Opal object database.
//!
//! One [`Store`] holds every table of an open database instance. Tables are
//! created from a validated [`TableBuilder`] definition and accessed through
//! [`TableHandle`] and [`RowHandle`], shared views that revalidate against
//! the live store on every operation instead of trusting a cached position.
//!
//! # Example
//!
//! ```rust
//! use opal_core::ColumnType;
//! use opal_storage::{create_table, Store, TableBuilder};
//!
//! let store = Store::shared("default");
//! let def = TableBuilder::new("class_Person")?
//!     .add_column("name", ColumnType::String)?
//!     .add_column("age", ColumnType::Integer)?
//!     .build();
//! let table = create_table(&store, def)?;
//!
//! let row = table.add_row()?;
//! row.set_string(0, "Alice".into())?;
//! assert_eq!(row.get_string(0)?, "Alice");
//! # Ok::<(), opal_core::Error>(())
//! ```

#![no_std]

extern crate alloc;

mod row;
mod store;
mod table;

pub use row::RowHandle;
pub use store::{create_table, SharedStore, Store};
pub use table::{
    strip_table_prefix, ColumnDef, TableBuilder, TableDef, TableHandle, TableStore, TABLE_PREFIX,
};
