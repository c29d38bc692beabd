//! Opal Dynamic - By-name dynamic object access for the Opal object
//! database.
//!
//! Where generated model code accesses fields through compile-time typed
//! accessors, this crate resolves fields at runtime: a [`DynamicObject`]
//! wraps one row and dispatches typed getters and setters by field name,
//! with the same null, link, and error semantics the generated path has.
//!
//! # Example
//!
//! ```rust
//! use opal_core::ColumnType;
//! use opal_dynamic::Database;
//! use opal_storage::TableBuilder;
//!
//! let db = Database::open("default");
//! let def = TableBuilder::new("Person")?
//!     .add_column("name", ColumnType::String)?
//!     .add_column("age", ColumnType::Integer)?
//!     .add_link("spouse", "Person")?
//!     .build();
//! db.create_table(def)?;
//!
//! let alice = db.create_object("Person")?;
//! alice.set_string("name", "Alice")?;
//! alice.set_long("age", 30)?;
//!
//! let bob = db.create_object("Person")?;
//! bob.set_string("name", "Bob")?;
//! bob.set_object("spouse", Some(&alice))?;
//!
//! assert_eq!(bob.get_object("spouse")?.unwrap().get_string("name")?, "Alice");
//! # Ok::<(), opal_core::Error>(())
//! ```

mod database;
mod list;
mod object;

pub use database::Database;
pub use list::{DynamicList, Iter};
pub use object::DynamicObject;
