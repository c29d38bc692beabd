//! Database instances: named stores plus the logical/internal name mapping.

use crate::object::DynamicObject;
use opal_core::Result;
use opal_storage::{
    create_table, strip_table_prefix, SharedStore, Store, TableDef, TableHandle, TABLE_PREFIX,
};
use std::rc::Rc;

/// An open database instance.
///
/// Clones share the same store; two objects belong to the same instance
/// exactly when their databases share one. Table names on this surface are
/// logical; the storage prefix is applied on the way in and stripped on the
/// way out.
#[derive(Clone)]
pub struct Database {
    path: String,
    store: SharedStore,
}

impl Database {
    /// Opens a fresh in-memory instance identified by `path`.
    pub fn open(path: impl Into<String>) -> Self {
        let path = path.into();
        let store = Store::shared(path.clone());
        Self { path, store }
    }

    /// Returns the path identifying this instance.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns whether `other` is a clone of this instance.
    pub(crate) fn same_instance(&self, other: &Database) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    /// Registers a table built with logical names, moving it and its link
    /// targets into the storage namespace.
    pub fn create_table(&self, def: TableDef) -> Result<TableHandle> {
        create_table(&self.store, def.prefixed(TABLE_PREFIX))
    }

    /// Returns a handle to the table with the given logical name.
    pub fn table(&self, name: &str) -> Result<TableHandle> {
        let internal = format!("{}{}", TABLE_PREFIX, name);
        if !self.store.borrow().has_table(&internal) {
            return Err(opal_core::Error::table_not_found(&internal));
        }
        Ok(TableHandle::new(self.store.clone(), internal))
    }

    /// Returns whether a table with the given logical name exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.store
            .borrow()
            .has_table(&format!("{}{}", TABLE_PREFIX, name))
    }

    /// Returns the logical names of all tables, sorted.
    pub fn table_names(&self) -> Vec<String> {
        self.store
            .borrow()
            .table_names()
            .iter()
            .map(|n| strip_table_prefix(n).to_string())
            .collect()
    }

    /// Returns the number of tables.
    pub fn table_count(&self) -> usize {
        self.store.borrow().table_count()
    }

    /// Appends an empty object to the named table and returns its accessor.
    pub fn create_object(&self, table: &str) -> Result<DynamicObject> {
        let row = self.table(table)?.add_row()?;
        Ok(DynamicObject::new(self.clone(), row))
    }

    /// Returns an accessor for the object currently at `index`.
    pub fn object(&self, table: &str, index: usize) -> Result<DynamicObject> {
        let row = self.table(table)?.row(index)?;
        Ok(DynamicObject::new(self.clone(), row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_core::{ColumnType, Error};
    use opal_storage::TableBuilder;

    #[test]
    fn test_logical_names_round_trip() {
        let db = Database::open("default");
        let def = TableBuilder::new("Person")
            .unwrap()
            .add_column("name", ColumnType::String)
            .unwrap()
            .build();
        db.create_table(def).unwrap();

        assert!(db.has_table("Person"));
        assert!(!db.has_table("class_Person"));
        assert_eq!(db.table_names(), ["Person"]);
        assert_eq!(db.table("Person").unwrap().name(), "class_Person");
        assert!(matches!(
            db.table("Dog"),
            Err(Error::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_clones_share_instance() {
        let db = Database::open("default");
        let other = db.clone();
        assert!(db.same_instance(&other));
        assert!(!db.same_instance(&Database::open("default")));
    }

    #[test]
    fn test_create_object() {
        let db = Database::open("default");
        let def = TableBuilder::new("Person")
            .unwrap()
            .add_column("age", ColumnType::Integer)
            .unwrap()
            .build();
        db.create_table(def).unwrap();

        let obj = db.create_object("Person").unwrap();
        assert!(obj.is_valid());
        assert_eq!(db.table("Person").unwrap().row_count().unwrap(), 1);
        let same = db.object("Person", 0).unwrap();
        assert_eq!(obj, same);
    }
}
