//! Table registry for a single database instance.
//!
//! A `Store` owns every table of one open database, keyed by internal name.
//! Link columns reference their target table by that name, so the whole
//! object graph, self-links included, lives behind a single shared cell and
//! every operation takes exactly one borrow.

use crate::table::{TableDef, TableHandle, TableStore};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use opal_core::{Error, Result};

/// Shared ownership of a store. Handles clone this freely.
pub type SharedStore = Rc<RefCell<Store>>;

/// All tables of one database instance.
pub struct Store {
    path: String,
    tables: HashMap<String, TableStore>,
}

impl Store {
    /// Creates an empty store identified by `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            tables: HashMap::new(),
        }
    }

    /// Wraps a new store in its shared cell.
    pub fn shared(path: impl Into<String>) -> SharedStore {
        Rc::new(RefCell::new(Self::new(path)))
    }

    /// Returns the path identifying this instance.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers a table. The name must be unused and every link target
    /// must resolve to an existing table or to the table being created.
    pub fn create_table(&mut self, def: TableDef) -> Result<()> {
        if self.tables.contains_key(&def.name) {
            return Err(Error::invalid_schema(format!(
                "Table already exists: {}",
                def.name
            )));
        }
        for col in &def.columns {
            if let Some(target) = col.link_target() {
                if target != def.name && !self.tables.contains_key(target) {
                    return Err(Error::table_not_found(target));
                }
            }
        }
        self.tables.insert(def.name.clone(), TableStore::new(def));
        Ok(())
    }

    /// Removes the row at `index` of the named table by relocating its
    /// last row into the freed slot, then keeps stored links consistent:
    /// in every table, links to the removed row are cleared (link columns
    /// nullified, list entries dropped) and links to the relocated row
    /// follow it to its new slot.
    pub fn move_last_over(&mut self, name: &str, index: usize) -> Result<()> {
        let last = {
            let table = self
                .get_table_mut(name)
                .ok_or_else(|| Error::table_not_found(name))?;
            let count = table.row_count();
            table.move_last_over(index)?;
            count - 1
        };
        for table in self.tables.values_mut() {
            table.retarget_links(name, index, last);
        }
        Ok(())
    }

    /// Removes a table and all its rows.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Returns the table with the given internal name.
    pub fn get_table(&self, name: &str) -> Option<&TableStore> {
        self.tables.get(name)
    }

    /// Returns the table with the given internal name, mutably.
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut TableStore> {
        self.tables.get_mut(name)
    }

    /// Returns whether a table with the given internal name exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns the internal names of all tables, sorted for stable output.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().map(|n| n.to_string()).collect();
        names.sort();
        names
    }

    /// Returns the number of tables.
    #[inline]
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Registers a table on a shared store and returns a handle to it.
pub fn create_table(store: &SharedStore, def: TableDef) -> Result<TableHandle> {
    let name = def.name.clone();
    store.borrow_mut().create_table(def)?;
    Ok(TableHandle::new(store.clone(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use opal_core::ColumnType;

    fn person_def() -> TableDef {
        TableBuilder::new("class_Person")
            .unwrap()
            .add_column("name", ColumnType::String)
            .unwrap()
            .build()
    }

    #[test]
    fn test_create_and_lookup() {
        let mut store = Store::new("default");
        store.create_table(person_def()).unwrap();
        assert!(store.has_table("class_Person"));
        assert_eq!(store.table_count(), 1);
        assert!(store.get_table("class_Person").is_some());
        assert!(store.get_table("class_Dog").is_none());
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut store = Store::new("default");
        store.create_table(person_def()).unwrap();
        assert!(matches!(
            store.create_table(person_def()),
            Err(Error::InvalidSchema { .. })
        ));
    }

    #[test]
    fn test_link_target_must_exist() {
        let mut store = Store::new("default");
        let def = TableBuilder::new("class_Dog")
            .unwrap()
            .add_link("owner", "class_Person")
            .unwrap()
            .build();
        assert!(matches!(
            store.create_table(def.clone()),
            Err(Error::TableNotFound { .. })
        ));
        store.create_table(person_def()).unwrap();
        store.create_table(def).unwrap();
    }

    #[test]
    fn test_self_link_allowed() {
        let mut store = Store::new("default");
        let def = TableBuilder::new("class_Person")
            .unwrap()
            .add_link("spouse", "class_Person")
            .unwrap()
            .build();
        store.create_table(def).unwrap();
    }

    #[test]
    fn test_drop_table() {
        let mut store = Store::new("default");
        store.create_table(person_def()).unwrap();
        store.drop_table("class_Person").unwrap();
        assert!(!store.has_table("class_Person"));
        assert!(matches!(
            store.drop_table("class_Person"),
            Err(Error::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_table_names_sorted() {
        let mut store = Store::new("default");
        store
            .create_table(TableBuilder::new("class_Zoo").unwrap().build())
            .unwrap();
        store.create_table(person_def()).unwrap();
        assert_eq!(store.table_names(), ["class_Person", "class_Zoo"]);
    }

    #[test]
    fn test_move_last_over_rewrites_incoming_links() {
        let mut store = Store::new("default");
        store.create_table(person_def()).unwrap();
        let def = TableBuilder::new("class_Dog")
            .unwrap()
            .add_link("owner", "class_Person")
            .unwrap()
            .add_link_list("pack", "class_Person")
            .unwrap()
            .build();
        store.create_table(def).unwrap();

        {
            let people = store.get_table_mut("class_Person").unwrap();
            for name in ["a", "b", "c"] {
                let (row, _) = people.add_row();
                people.set_string(0, row, name.into()).unwrap();
            }
        }
        {
            let dogs = store.get_table_mut("class_Dog").unwrap();
            let (d0, _) = dogs.add_row();
            let (d1, _) = dogs.add_row();
            dogs.set_link(0, d0, 0).unwrap();
            dogs.set_link(0, d1, 2).unwrap();
            dogs.list_add(1, d0, 0).unwrap();
            dogs.list_add(1, d0, 2).unwrap();
            dogs.list_add(1, d0, 1).unwrap();
        }

        store.move_last_over("class_Person", 0).unwrap();

        let dogs = store.get_table("class_Dog").unwrap();
        // The link to the removed row is cleared, not left pointing at
        // whatever was relocated into its slot.
        assert_eq!(dogs.get_link(0, 0).unwrap(), None);
        // The link to the relocated row follows it into the freed slot.
        assert_eq!(dogs.get_link(0, 1).unwrap(), Some(0));
        // List entries for the removed row are dropped, the rest remapped.
        assert_eq!(dogs.list_len(1, 0).unwrap(), 2);
        assert_eq!(dogs.list_get(1, 0, 0).unwrap(), 0);
        assert_eq!(dogs.list_get(1, 0, 1).unwrap(), 1);
    }

    #[test]
    fn test_move_last_over_clears_self_links() {
        let mut store = Store::new("default");
        let def = TableBuilder::new("class_Person")
            .unwrap()
            .add_link("spouse", "class_Person")
            .unwrap()
            .build();
        store.create_table(def).unwrap();
        {
            let people = store.get_table_mut("class_Person").unwrap();
            let (a, _) = people.add_row();
            let (b, _) = people.add_row();
            people.set_link(0, a, b).unwrap();
            people.set_link(0, b, a).unwrap();
        }

        // Removing the last row clears links to it without remapping.
        store.move_last_over("class_Person", 1).unwrap();
        let people = store.get_table("class_Person").unwrap();
        assert_eq!(people.row_count(), 1);
        assert_eq!(people.get_link(0, 0).unwrap(), None);
    }

    #[test]
    fn test_shared_handle_invalidated_by_drop() {
        let store = Store::shared("default");
        let table = create_table(&store, person_def()).unwrap();
        assert!(table.is_valid());
        store.borrow_mut().drop_table("class_Person").unwrap();
        assert!(!table.is_valid());
        assert!(matches!(
            table.row_count(),
            Err(Error::TableNotFound { .. })
        ));
    }
}
