//! Row handles with attachment tracking.
//!
//! A `RowHandle` binds to one row slot and remembers the row identity it saw
//! at bind time. Every access revalidates against the live table: if the
//! table is gone, or the slot holds a different row after a `move_last_over`
//! relocation, the access reports `InvalidObject` instead of reading
//! whatever row now occupies the slot.

use crate::store::SharedStore;
use crate::table::{TableHandle, TableStore};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use opal_core::{ColumnType, Error, Result, Value};

#[derive(Clone, Debug)]
enum RowState {
    Attached {
        table: String,
        index: usize,
        row_id: u64,
    },
    /// Terminal state after an explicit invalidation. The binding is kept
    /// so identity stays pinned to the row the handle used to reference.
    Detached {
        table: String,
        index: usize,
        row_id: u64,
    },
}

/// Shared, revalidating view of one row.
#[derive(Clone)]
pub struct RowHandle {
    store: SharedStore,
    state: RowState,
}

impl RowHandle {
    pub(crate) fn attached(store: SharedStore, table: String, index: usize, row_id: u64) -> Self {
        Self {
            store,
            state: RowState::Attached {
                table,
                index,
                row_id,
            },
        }
    }

    /// Returns the underlying shared store.
    pub fn shared_store(&self) -> &SharedStore {
        &self.store
    }

    /// Returns whether the handle still resolves to its original row.
    pub fn is_attached(&self) -> bool {
        self.with_table(|_, _| Ok(())).is_ok()
    }

    /// Permanently detaches the handle. Used after the row is deleted.
    pub fn invalidate(&mut self) {
        if let RowState::Attached {
            table,
            index,
            row_id,
        } = &self.state
        {
            let detached = RowState::Detached {
                table: table.clone(),
                index: *index,
                row_id: *row_id,
            };
            self.state = detached;
        }
    }

    /// Returns the slot index this handle is bound to.
    pub fn index(&self) -> Result<usize> {
        self.with_table(|_, index| Ok(index))
    }

    /// Returns the internal name of the table this handle was bound to.
    pub fn table_name(&self) -> &str {
        self.binding().0
    }

    /// Returns the raw (table, index, row-id) binding, whether or not it
    /// still resolves. This is what object identity hashes over, so two
    /// handles to different former rows never collapse into one another
    /// after invalidation.
    pub fn binding(&self) -> (&str, usize, u64) {
        match &self.state {
            RowState::Attached {
                table,
                index,
                row_id,
            }
            | RowState::Detached {
                table,
                index,
                row_id,
            } => (table, *index, *row_id),
        }
    }

    /// Returns a handle to the owning table.
    pub fn table(&self) -> Result<TableHandle> {
        match &self.state {
            RowState::Attached { table, .. } => {
                Ok(TableHandle::new(self.store.clone(), table.clone()))
            }
            RowState::Detached { .. } => Err(Error::InvalidObject),
        }
    }

    fn with_table<R>(&self, f: impl FnOnce(&TableStore, usize) -> Result<R>) -> Result<R> {
        match &self.state {
            RowState::Attached {
                table,
                index,
                row_id,
            } => {
                let store = self.store.borrow();
                let t = store.get_table(table).ok_or(Error::InvalidObject)?;
                if t.row_id(*index) != Some(*row_id) {
                    return Err(Error::InvalidObject);
                }
                f(t, *index)
            }
            RowState::Detached { .. } => Err(Error::InvalidObject),
        }
    }

    fn with_table_mut<R>(&self, f: impl FnOnce(&mut TableStore, usize) -> Result<R>) -> Result<R> {
        match &self.state {
            RowState::Attached {
                table,
                index,
                row_id,
            } => {
                let mut store = self.store.borrow_mut();
                let t = store.get_table_mut(table).ok_or(Error::InvalidObject)?;
                if t.row_id(*index) != Some(*row_id) {
                    return Err(Error::InvalidObject);
                }
                f(t, *index)
            }
            RowState::Detached { .. } => Err(Error::InvalidObject),
        }
    }

    // ----- column metadata -----

    pub fn column_count(&self) -> Result<usize> {
        self.with_table(|t, _| Ok(t.column_count()))
    }

    pub fn column_name(&self, col: usize) -> Result<String> {
        self.with_table(|t, _| t.column_name(col).map(str::to_string))
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.with_table(|t, _| t.column_index(name))
    }

    /// Returns whether a column with the given name exists. Detached
    /// handles have no columns.
    pub fn has_column(&self, name: &str) -> bool {
        self.with_table(|t, _| Ok(t.has_column(name)))
            .unwrap_or(false)
    }

    pub fn column_type(&self, col: usize) -> Result<ColumnType> {
        self.with_table(|t, _| t.column_type(col))
    }

    // ----- typed access -----

    pub fn get_bool(&self, col: usize) -> Result<bool> {
        self.with_table(|t, row| t.get_bool(col, row))
    }

    pub fn get_long(&self, col: usize) -> Result<i64> {
        self.with_table(|t, row| t.get_long(col, row))
    }

    pub fn get_float(&self, col: usize) -> Result<f32> {
        self.with_table(|t, row| t.get_float(col, row))
    }

    pub fn get_double(&self, col: usize) -> Result<f64> {
        self.with_table(|t, row| t.get_double(col, row))
    }

    pub fn get_string(&self, col: usize) -> Result<String> {
        self.with_table(|t, row| t.get_string(col, row))
    }

    pub fn get_binary(&self, col: usize) -> Result<Vec<u8>> {
        self.with_table(|t, row| t.get_binary(col, row))
    }

    pub fn get_date(&self, col: usize) -> Result<i64> {
        self.with_table(|t, row| t.get_date(col, row))
    }

    pub fn set_bool(&self, col: usize, value: bool) -> Result<()> {
        self.with_table_mut(|t, row| t.set_bool(col, row, value))
    }

    pub fn set_long(&self, col: usize, value: i64) -> Result<()> {
        self.with_table_mut(|t, row| t.set_long(col, row, value))
    }

    pub fn set_float(&self, col: usize, value: f32) -> Result<()> {
        self.with_table_mut(|t, row| t.set_float(col, row, value))
    }

    pub fn set_double(&self, col: usize, value: f64) -> Result<()> {
        self.with_table_mut(|t, row| t.set_double(col, row, value))
    }

    pub fn set_string(&self, col: usize, value: String) -> Result<()> {
        self.with_table_mut(|t, row| t.set_string(col, row, value))
    }

    pub fn set_binary(&self, col: usize, value: Vec<u8>) -> Result<()> {
        self.with_table_mut(|t, row| t.set_binary(col, row, value))
    }

    pub fn set_date(&self, col: usize, value: i64) -> Result<()> {
        self.with_table_mut(|t, row| t.set_date(col, row, value))
    }

    /// Reads a scalar cell as a tagged value; `None` for link kinds and
    /// opaque columns.
    pub fn get_value(&self, col: usize) -> Result<Option<Value>> {
        self.with_table(|t, row| t.get_value(col, row))
    }

    /// Writes a scalar cell from a tagged value.
    pub fn set_value(&self, col: usize, value: Value) -> Result<()> {
        self.with_table_mut(|t, row| t.set_value(col, row, value))
    }

    // ----- link access -----

    pub fn is_null_link(&self, col: usize) -> Result<bool> {
        self.with_table(|t, row| t.is_null_link(col, row))
    }

    pub fn get_link(&self, col: usize) -> Result<Option<usize>> {
        self.with_table(|t, row| t.get_link(col, row))
    }

    pub fn set_link(&self, col: usize, target_row: usize) -> Result<()> {
        self.with_table_mut(|t, row| t.set_link(col, row, target_row))
    }

    pub fn nullify_link(&self, col: usize) -> Result<()> {
        self.with_table_mut(|t, row| t.nullify_link(col, row))
    }

    pub fn list_len(&self, col: usize) -> Result<usize> {
        self.with_table(|t, row| t.list_len(col, row))
    }

    pub fn list_get(&self, col: usize, pos: usize) -> Result<usize> {
        self.with_table(|t, row| t.list_get(col, row, pos))
    }

    pub fn list_add(&self, col: usize, target_row: usize) -> Result<()> {
        self.with_table_mut(|t, row| t.list_add(col, row, target_row))
    }

    pub fn list_clear(&self, col: usize) -> Result<()> {
        self.with_table_mut(|t, row| t.list_clear(col, row))
    }

    /// Returns a handle to the table the link column at `col` points to.
    pub fn link_target(&self, col: usize) -> Result<TableHandle> {
        let target = self.with_table(|t, _| t.link_target(col).map(str::to_string))?;
        Ok(TableHandle::new(self.store.clone(), target))
    }
}
