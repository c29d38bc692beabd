//! Live views of link-list columns.

use crate::database::Database;
use crate::object::DynamicObject;
use opal_core::{Error, Result};
use opal_storage::{RowHandle, TableHandle};

/// An ordered, duplicate-permitting sequence of links in one column of one
/// row.
///
/// The view is live: it holds no element snapshot, and mutation of the
/// underlying table after the view was obtained is observable through it.
#[derive(Clone)]
pub struct DynamicList {
    db: Database,
    row: RowHandle,
    col: usize,
}

impl DynamicList {
    pub(crate) fn new(db: Database, row: RowHandle, col: usize) -> Self {
        Self { db, row, col }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> Result<usize> {
        self.row.list_len(self.col)
    }

    /// Returns whether the list has no elements.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Returns a handle to the list's target table.
    pub fn target(&self) -> Result<TableHandle> {
        self.row.link_target(self.col)
    }

    /// Returns the element at `pos`, resolved against the target table at
    /// call time.
    pub fn get(&self, pos: usize) -> Result<DynamicObject> {
        let target_row = self.row.list_get(self.col, pos)?;
        let row = self.target()?.row(target_row)?;
        Ok(DynamicObject::new(self.db.clone(), row))
    }

    /// Checks that `obj` may be stored in this list and returns its row
    /// index. Same validation chain as a single-link write.
    pub(crate) fn validate(&self, obj: &DynamicObject) -> Result<usize> {
        let target_row = obj.row().index()?;
        if !self.db.same_instance(obj.database()) {
            return Err(Error::CrossDatabaseLink);
        }
        let expected = self.target()?;
        let got = obj.row().table()?;
        if !expected.has_same_schema(&got) {
            return Err(Error::schema_mismatch(expected.name(), got.name()));
        }
        Ok(target_row)
    }

    /// Appends a link to `obj`.
    pub fn add(&self, obj: &DynamicObject) -> Result<()> {
        let target_row = self.validate(obj)?;
        self.row.list_add(self.col, target_row)
    }

    /// Removes all elements. The linked objects themselves are untouched.
    pub fn clear(&self) -> Result<()> {
        self.row.list_clear(self.col)
    }

    /// Iterates the list, resolving each element lazily. The iterator ends
    /// early if the owning row becomes invalid mid-iteration.
    pub fn iter(&self) -> Iter<'_> {
        Iter { list: self, pos: 0 }
    }
}

/// Lazy element iterator over a [`DynamicList`].
pub struct Iter<'a> {
    list: &'a DynamicList,
    pos: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<DynamicObject>;

    fn next(&mut self) -> Option<Self::Item> {
        // Length is re-read each step so concurrent append/clear through
        // another view is observed.
        let len = self.list.len().ok()?;
        if self.pos >= len {
            return None;
        }
        let item = self.list.get(self.pos);
        self.pos += 1;
        Some(item)
    }
}

impl<'a> IntoIterator for &'a DynamicList {
    type Item = Result<DynamicObject>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
