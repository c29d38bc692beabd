//! Columnar table storage for the Opal object database.
//!
//! A `TableStore` holds one table's rows as per-column typed arrays plus a
//! per-slot row identity. Handles never index into it directly; they go
//! through `TableHandle`/`RowHandle`, which revalidate against the store on
//! every operation.

use crate::row::RowHandle;
use crate::store::SharedStore;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;
use opal_core::{ColumnSpec, ColumnType, Error, Result, TableSpec, Value};

/// Prefix applied to the logical table name when it is stored.
pub const TABLE_PREFIX: &str = "class_";

/// Recovers the logical table name from an internal one.
pub fn strip_table_prefix(name: &str) -> &str {
    name.strip_prefix(TABLE_PREFIX).unwrap_or(name)
}

/// A column definition inside a table: spec shape plus, for link kinds, the
/// internal name of the target table.
#[derive(Clone, Debug)]
pub struct ColumnDef {
    name: String,
    ty: ColumnType,
    sub: Option<TableSpec>,
    target: Option<String>,
}

impl ColumnDef {
    /// Returns the column name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage type.
    #[inline]
    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    /// Returns the nested sub-spec of a `Table` column.
    #[inline]
    pub fn sub_spec(&self) -> Option<&TableSpec> {
        self.sub.as_ref()
    }

    /// Returns the link target's internal table name for link kinds.
    #[inline]
    pub fn link_target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

/// The output of a `TableBuilder`: everything `Store::create_table` needs.
#[derive(Clone, Debug)]
pub struct TableDef {
    pub(crate) name: String,
    pub(crate) columns: Vec<ColumnDef>,
}

impl TableDef {
    /// Returns the table name as built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy with `prefix` prepended to the table name and to
    /// every link target. Used by the database layer to move logical names
    /// into the storage namespace.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.name = format!("{}{}", prefix, self.name);
        for col in &mut self.columns {
            if let Some(target) = col.target.as_mut() {
                *target = format!("{}{}", prefix, target);
            }
        }
        self
    }
}

/// Builder for table definitions. Validates naming rules and duplicate
/// columns as columns are added, like the schema builder it is modeled on.
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDef>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
        })
    }

    fn check_new_column(&self, name: &str) -> Result<()> {
        check_naming_rules(name)?;
        if self.columns.iter().any(|c| c.name == name) {
            return Err(Error::invalid_schema(format!(
                "Column already exists: {}",
                name
            )));
        }
        Ok(())
    }

    /// Adds a scalar column. Link, link-list, nested-table and mixed
    /// columns have dedicated methods.
    pub fn add_column(mut self, name: impl Into<String>, ty: ColumnType) -> Result<Self> {
        let name = name.into();
        self.check_new_column(&name)?;
        if ty.is_link_kind() || !ty.is_readable() {
            return Err(Error::invalid_schema(format!(
                "Column {} must be declared through add_link/add_link_list/add_table/add_mixed",
                name
            )));
        }
        self.columns.push(ColumnDef {
            name,
            ty,
            sub: None,
            target: None,
        });
        Ok(self)
    }

    /// Adds a single-object link column pointing at `target`.
    pub fn add_link(mut self, name: impl Into<String>, target: impl Into<String>) -> Result<Self> {
        let name = name.into();
        self.check_new_column(&name)?;
        self.columns.push(ColumnDef {
            name,
            ty: ColumnType::Link,
            sub: None,
            target: Some(target.into()),
        });
        Ok(self)
    }

    /// Adds a link-list column pointing at `target`.
    pub fn add_link_list(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        self.check_new_column(&name)?;
        self.columns.push(ColumnDef {
            name,
            ty: ColumnType::LinkList,
            sub: None,
            target: Some(target.into()),
        });
        Ok(self)
    }

    /// Adds a nested-table column with the given sub-spec.
    pub fn add_table(mut self, name: impl Into<String>, sub: TableSpec) -> Result<Self> {
        let name = name.into();
        self.check_new_column(&name)?;
        self.columns.push(ColumnDef {
            name,
            ty: ColumnType::Table,
            sub: Some(sub),
            target: None,
        });
        Ok(self)
    }

    /// Adds a mixed (heterogeneous) column.
    pub fn add_mixed(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        self.check_new_column(&name)?;
        self.columns.push(ColumnDef {
            name,
            ty: ColumnType::Mixed,
            sub: None,
            target: None,
        });
        Ok(self)
    }

    /// Builds the table definition.
    pub fn build(self) -> TableDef {
        TableDef {
            name: self.name,
            columns: self.columns,
        }
    }
}

fn check_naming_rules(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_schema("Name cannot be empty"));
    }
    let first = name.chars().next().unwrap();
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::invalid_schema(format!(
            "Name must start with letter or underscore: {}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::invalid_schema(format!(
            "Name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

/// Per-column storage: one typed array per column, kept in row order.
///
/// `Table` and `Mixed` columns carry no per-row payload in the dynamic
/// path; their variant stores nothing and row length is tracked by the
/// table's row-identity vector.
#[derive(Clone, Debug)]
pub(crate) enum ColumnData {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Str(Vec<String>),
    Binary(Vec<Vec<u8>>),
    Date(Vec<i64>),
    Link(Vec<Option<usize>>),
    LinkList(Vec<Vec<usize>>),
    Opaque,
}

impl ColumnData {
    fn for_type(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Boolean => ColumnData::Bool(Vec::new()),
            ColumnType::Integer => ColumnData::Int(Vec::new()),
            ColumnType::Float => ColumnData::Float(Vec::new()),
            ColumnType::Double => ColumnData::Double(Vec::new()),
            ColumnType::String => ColumnData::Str(Vec::new()),
            ColumnType::Binary => ColumnData::Binary(Vec::new()),
            ColumnType::Date => ColumnData::Date(Vec::new()),
            ColumnType::Link => ColumnData::Link(Vec::new()),
            ColumnType::LinkList => ColumnData::LinkList(Vec::new()),
            ColumnType::Table | ColumnType::Mixed => ColumnData::Opaque,
        }
    }

    fn push_default(&mut self) {
        match self {
            ColumnData::Bool(v) => v.push(false),
            ColumnData::Int(v) => v.push(0),
            ColumnData::Float(v) => v.push(0.0),
            ColumnData::Double(v) => v.push(0.0),
            ColumnData::Str(v) => v.push(String::new()),
            ColumnData::Binary(v) => v.push(Vec::new()),
            ColumnData::Date(v) => v.push(0),
            ColumnData::Link(v) => v.push(None),
            ColumnData::LinkList(v) => v.push(Vec::new()),
            ColumnData::Opaque => {}
        }
    }

    fn swap_remove(&mut self, index: usize) {
        match self {
            ColumnData::Bool(v) => {
                v.swap_remove(index);
            }
            ColumnData::Int(v) => {
                v.swap_remove(index);
            }
            ColumnData::Float(v) => {
                v.swap_remove(index);
            }
            ColumnData::Double(v) => {
                v.swap_remove(index);
            }
            ColumnData::Str(v) => {
                v.swap_remove(index);
            }
            ColumnData::Binary(v) => {
                v.swap_remove(index);
            }
            ColumnData::Date(v) => {
                v.swap_remove(index);
            }
            ColumnData::Link(v) => {
                v.swap_remove(index);
            }
            ColumnData::LinkList(v) => {
                v.swap_remove(index);
            }
            ColumnData::Opaque => {}
        }
    }
}

/// Columnar storage for a single table.
pub struct TableStore {
    name: String,
    columns: Vec<ColumnDef>,
    /// Name → index lookup, built once at creation and reused per access.
    col_index: HashMap<String, usize>,
    data: Vec<ColumnData>,
    /// Per-slot row identity; a slot's id changes when another row is
    /// relocated into it by `move_last_over`.
    row_ids: Vec<u64>,
    next_row_id: u64,
}

impl TableStore {
    /// Creates an empty store for the given definition.
    pub fn new(def: TableDef) -> Self {
        let col_index = def
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        let data = def
            .columns
            .iter()
            .map(|c| ColumnData::for_type(c.ty))
            .collect();
        Self {
            name: def.name,
            columns: def.columns,
            col_index,
            data,
            row_ids: Vec::new(),
            next_row_id: 0,
        }
    }

    /// Returns the internal table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_ids.len()
    }

    /// Returns the identity of the row currently at `index`.
    pub fn row_id(&self, index: usize) -> Option<u64> {
        self.row_ids.get(index).copied()
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column definitions in declaration order.
    #[inline]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the name of the column at `index`.
    pub fn column_name(&self, col: usize) -> Result<&str> {
        self.column(col).map(|c| c.name.as_str())
    }

    /// Returns the declared type of the column at `index`.
    pub fn column_type(&self, col: usize) -> Result<ColumnType> {
        self.column(col).map(|c| c.ty)
    }

    /// Resolves a column name to its index.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.col_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::field_not_found(&self.name, name))
    }

    /// Returns whether a column with the given name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.col_index.contains_key(name)
    }

    /// Returns the internal name of the table a link column points to.
    pub fn link_target(&self, col: usize) -> Result<&str> {
        let c = self.column(col)?;
        c.target
            .as_deref()
            .ok_or_else(|| Error::type_mismatch(&c.name, ColumnType::Link, c.ty))
    }

    /// Builds the live schema of this table.
    ///
    /// `Table` columns keep their declared sub-spec; link kinds carry none
    /// (their target schema is compared through `has_same_schema`).
    pub fn spec(&self) -> TableSpec {
        let mut spec = TableSpec::new();
        for c in &self.columns {
            match &c.sub {
                Some(sub) => spec.push(ColumnSpec::table(c.name.clone(), sub.clone())),
                None => {
                    spec.add_column(c.ty, &c.name);
                }
            }
        }
        spec
    }

    /// Appends an empty row of per-type defaults. Returns its index and
    /// identity.
    pub fn add_row(&mut self) -> (usize, u64) {
        for col in &mut self.data {
            col.push_default();
        }
        let id = self.next_row_id;
        self.next_row_id += 1;
        self.row_ids.push(id);
        (self.row_ids.len() - 1, id)
    }

    /// Removes the row at `index` by relocating the last row into its slot
    /// and shrinking the table by one. Stale handles to either slot detect
    /// the relocation through the row identity and report invalid.
    ///
    /// This is the raw per-table primitive; links stored in other rows are
    /// rewritten by `Store::move_last_over`, which sees every table.
    pub fn move_last_over(&mut self, index: usize) -> Result<()> {
        if index >= self.row_ids.len() {
            return Err(Error::index_out_of_bounds(index, self.row_ids.len()));
        }
        self.row_ids.swap_remove(index);
        for col in &mut self.data {
            col.swap_remove(index);
        }
        Ok(())
    }

    /// Rewrites stored link targets after `target_table` removed the row
    /// at `removed` by move-last-over: references to the removed row are
    /// dropped (links nullified, list entries removed) and references to
    /// the relocated last row (`last`) follow it into the freed slot.
    pub(crate) fn retarget_links(&mut self, target_table: &str, removed: usize, last: usize) {
        for (col, def) in self.columns.iter().enumerate() {
            if def.target.as_deref() != Some(target_table) {
                continue;
            }
            match &mut self.data[col] {
                ColumnData::Link(cells) => {
                    for cell in cells.iter_mut() {
                        *cell = match *cell {
                            Some(t) if t == removed => None,
                            Some(t) if t == last => Some(removed),
                            other => other,
                        };
                    }
                }
                ColumnData::LinkList(cells) => {
                    for list in cells.iter_mut() {
                        list.retain(|&t| t != removed);
                        for t in list.iter_mut() {
                            if *t == last {
                                *t = removed;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    // ----- typed getters -----

    pub fn get_bool(&self, col: usize, row: usize) -> Result<bool> {
        match self.column_data(col)? {
            ColumnData::Bool(v) => self.cell(v.get(row).copied(), row),
            _ => Err(self.mismatch(col, ColumnType::Boolean)),
        }
    }

    pub fn get_long(&self, col: usize, row: usize) -> Result<i64> {
        match self.column_data(col)? {
            ColumnData::Int(v) => self.cell(v.get(row).copied(), row),
            _ => Err(self.mismatch(col, ColumnType::Integer)),
        }
    }

    pub fn get_float(&self, col: usize, row: usize) -> Result<f32> {
        match self.column_data(col)? {
            ColumnData::Float(v) => self.cell(v.get(row).copied(), row),
            _ => Err(self.mismatch(col, ColumnType::Float)),
        }
    }

    pub fn get_double(&self, col: usize, row: usize) -> Result<f64> {
        match self.column_data(col)? {
            ColumnData::Double(v) => self.cell(v.get(row).copied(), row),
            _ => Err(self.mismatch(col, ColumnType::Double)),
        }
    }

    pub fn get_string(&self, col: usize, row: usize) -> Result<String> {
        match self.column_data(col)? {
            ColumnData::Str(v) => self.cell(v.get(row).cloned(), row),
            _ => Err(self.mismatch(col, ColumnType::String)),
        }
    }

    pub fn get_binary(&self, col: usize, row: usize) -> Result<Vec<u8>> {
        match self.column_data(col)? {
            ColumnData::Binary(v) => self.cell(v.get(row).cloned(), row),
            _ => Err(self.mismatch(col, ColumnType::Binary)),
        }
    }

    pub fn get_date(&self, col: usize, row: usize) -> Result<i64> {
        match self.column_data(col)? {
            ColumnData::Date(v) => self.cell(v.get(row).copied(), row),
            _ => Err(self.mismatch(col, ColumnType::Date)),
        }
    }

    // ----- typed setters -----

    pub fn set_bool(&mut self, col: usize, row: usize, value: bool) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Boolean);
        match self.column_data_mut(col)? {
            ColumnData::Bool(v) => Self::store(v.get_mut(row), value, row),
            _ => Err(err),
        }
    }

    pub fn set_long(&mut self, col: usize, row: usize, value: i64) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Integer);
        match self.column_data_mut(col)? {
            ColumnData::Int(v) => Self::store(v.get_mut(row), value, row),
            _ => Err(err),
        }
    }

    pub fn set_float(&mut self, col: usize, row: usize, value: f32) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Float);
        match self.column_data_mut(col)? {
            ColumnData::Float(v) => Self::store(v.get_mut(row), value, row),
            _ => Err(err),
        }
    }

    pub fn set_double(&mut self, col: usize, row: usize, value: f64) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Double);
        match self.column_data_mut(col)? {
            ColumnData::Double(v) => Self::store(v.get_mut(row), value, row),
            _ => Err(err),
        }
    }

    pub fn set_string(&mut self, col: usize, row: usize, value: String) -> Result<()> {
        let err = self.mismatch(col, ColumnType::String);
        match self.column_data_mut(col)? {
            ColumnData::Str(v) => Self::store(v.get_mut(row), value, row),
            _ => Err(err),
        }
    }

    pub fn set_binary(&mut self, col: usize, row: usize, value: Vec<u8>) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Binary);
        match self.column_data_mut(col)? {
            ColumnData::Binary(v) => Self::store(v.get_mut(row), value, row),
            _ => Err(err),
        }
    }

    pub fn set_date(&mut self, col: usize, row: usize, value: i64) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Date);
        match self.column_data_mut(col)? {
            ColumnData::Date(v) => Self::store(v.get_mut(row), value, row),
            _ => Err(err),
        }
    }

    /// Reads a scalar cell as a tagged value. Link kinds and opaque
    /// columns have no scalar representation and read as `None`.
    pub fn get_value(&self, col: usize, row: usize) -> Result<Option<Value>> {
        let value = match self.column_data(col)? {
            ColumnData::Bool(v) => Value::Bool(self.cell(v.get(row).copied(), row)?),
            ColumnData::Int(v) => Value::Int(self.cell(v.get(row).copied(), row)?),
            ColumnData::Float(v) => Value::Float(self.cell(v.get(row).copied(), row)?),
            ColumnData::Double(v) => Value::Double(self.cell(v.get(row).copied(), row)?),
            ColumnData::Str(v) => Value::Str(self.cell(v.get(row).cloned(), row)?),
            ColumnData::Binary(v) => Value::Binary(self.cell(v.get(row).cloned(), row)?),
            ColumnData::Date(v) => Value::Date(self.cell(v.get(row).copied(), row)?),
            ColumnData::Link(_) | ColumnData::LinkList(_) | ColumnData::Opaque => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Writes a scalar cell from a tagged value. The value's type must
    /// match the column's declared type.
    pub fn set_value(&mut self, col: usize, row: usize, value: Value) -> Result<()> {
        match value {
            Value::Bool(v) => self.set_bool(col, row, v),
            Value::Int(v) => self.set_long(col, row, v),
            Value::Float(v) => self.set_float(col, row, v),
            Value::Double(v) => self.set_double(col, row, v),
            Value::Str(v) => self.set_string(col, row, v),
            Value::Binary(v) => self.set_binary(col, row, v),
            Value::Date(v) => self.set_date(col, row, v),
        }
    }

    // ----- link storage -----

    /// Null test for link columns. A link list is never null, and non-link
    /// columns never report null through this call.
    pub fn is_null_link(&self, col: usize, row: usize) -> Result<bool> {
        match self.column_data(col)? {
            ColumnData::Link(v) => self.cell(v.get(row).map(|l| l.is_none()), row),
            _ => Ok(false),
        }
    }

    pub fn get_link(&self, col: usize, row: usize) -> Result<Option<usize>> {
        match self.column_data(col)? {
            ColumnData::Link(v) => self.cell(v.get(row).copied(), row),
            _ => Err(self.mismatch(col, ColumnType::Link)),
        }
    }

    pub fn set_link(&mut self, col: usize, row: usize, target_row: usize) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Link);
        match self.column_data_mut(col)? {
            ColumnData::Link(v) => Self::store(v.get_mut(row), Some(target_row), row),
            _ => Err(err),
        }
    }

    pub fn nullify_link(&mut self, col: usize, row: usize) -> Result<()> {
        let err = self.mismatch(col, ColumnType::Link);
        match self.column_data_mut(col)? {
            ColumnData::Link(v) => Self::store(v.get_mut(row), None, row),
            _ => Err(err),
        }
    }

    pub fn list_len(&self, col: usize, row: usize) -> Result<usize> {
        match self.column_data(col)? {
            ColumnData::LinkList(v) => self.cell(v.get(row).map(|l| l.len()), row),
            _ => Err(self.mismatch(col, ColumnType::LinkList)),
        }
    }

    pub fn list_get(&self, col: usize, row: usize, pos: usize) -> Result<usize> {
        match self.column_data(col)? {
            ColumnData::LinkList(v) => {
                let list = self.cell(v.get(row), row)?;
                list.get(pos)
                    .copied()
                    .ok_or_else(|| Error::index_out_of_bounds(pos, list.len()))
            }
            _ => Err(self.mismatch(col, ColumnType::LinkList)),
        }
    }

    pub fn list_add(&mut self, col: usize, row: usize, target_row: usize) -> Result<()> {
        let err = self.mismatch(col, ColumnType::LinkList);
        match self.column_data_mut(col)? {
            ColumnData::LinkList(v) => match v.get_mut(row) {
                Some(list) => {
                    list.push(target_row);
                    Ok(())
                }
                None => Err(Error::index_out_of_bounds(row, 0)),
            },
            _ => Err(err),
        }
    }

    pub fn list_clear(&mut self, col: usize, row: usize) -> Result<()> {
        let err = self.mismatch(col, ColumnType::LinkList);
        match self.column_data_mut(col)? {
            ColumnData::LinkList(v) => match v.get_mut(row) {
                Some(list) => {
                    list.clear();
                    Ok(())
                }
                None => Err(Error::index_out_of_bounds(row, 0)),
            },
            _ => Err(err),
        }
    }

    // ----- internals -----

    fn column(&self, col: usize) -> Result<&ColumnDef> {
        self.columns
            .get(col)
            .ok_or_else(|| Error::index_out_of_bounds(col, self.columns.len()))
    }

    fn column_data(&self, col: usize) -> Result<&ColumnData> {
        self.data
            .get(col)
            .ok_or_else(|| Error::index_out_of_bounds(col, self.data.len()))
    }

    fn column_data_mut(&mut self, col: usize) -> Result<&mut ColumnData> {
        let len = self.data.len();
        self.data
            .get_mut(col)
            .ok_or_else(|| Error::index_out_of_bounds(col, len))
    }

    fn cell<T>(&self, value: Option<T>, row: usize) -> Result<T> {
        value.ok_or_else(|| Error::index_out_of_bounds(row, self.row_ids.len()))
    }

    fn store<T>(slot: Option<&mut T>, value: T, row: usize) -> Result<()> {
        match slot {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::index_out_of_bounds(row, 0)),
        }
    }

    fn mismatch(&self, col: usize, expected: ColumnType) -> Error {
        match self.column(col) {
            Ok(c) => Error::type_mismatch(&c.name, expected, c.ty),
            Err(e) => e,
        }
    }
}

/// Shared, non-owning view of one table inside a store.
#[derive(Clone)]
pub struct TableHandle {
    store: SharedStore,
    name: String,
}

impl TableHandle {
    /// Creates a handle for the named table.
    pub fn new(store: SharedStore, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Returns the internal table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying shared store. Instance identity checks use
    /// pointer equality on this.
    pub fn shared_store(&self) -> &SharedStore {
        &self.store
    }

    /// Returns whether the table still exists in its store.
    pub fn is_valid(&self) -> bool {
        self.store.borrow().has_table(&self.name)
    }

    fn with_table<R>(&self, f: impl FnOnce(&TableStore) -> R) -> Result<R> {
        let store = self.store.borrow();
        let table = store
            .get_table(&self.name)
            .ok_or_else(|| Error::table_not_found(&self.name))?;
        Ok(f(table))
    }

    fn with_table_mut<R>(&self, f: impl FnOnce(&mut TableStore) -> R) -> Result<R> {
        let mut store = self.store.borrow_mut();
        let table = store
            .get_table_mut(&self.name)
            .ok_or_else(|| Error::table_not_found(&self.name))?;
        Ok(f(table))
    }

    /// Returns the table's live schema.
    pub fn spec(&self) -> Result<TableSpec> {
        self.with_table(|t| t.spec())
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> Result<usize> {
        self.with_table(|t| t.row_count())
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> Result<usize> {
        self.with_table(|t| t.column_count())
    }

    /// Appends an empty row and returns a handle bound to it.
    pub fn add_row(&self) -> Result<RowHandle> {
        let (index, row_id) = self.with_table_mut(|t| t.add_row())?;
        Ok(RowHandle::attached(
            self.store.clone(),
            self.name.clone(),
            index,
            row_id,
        ))
    }

    /// Returns a handle to the row currently at `index`.
    pub fn row(&self, index: usize) -> Result<RowHandle> {
        let row_id = self.with_table(|t| {
            t.row_id(index)
                .ok_or_else(|| Error::index_out_of_bounds(index, t.row_count()))
        })??;
        Ok(RowHandle::attached(
            self.store.clone(),
            self.name.clone(),
            index,
            row_id,
        ))
    }

    /// Removes the row at `index` by relocating the last row into its
    /// slot, then rewrites links in every table that pointed at the
    /// removed or relocated row.
    pub fn move_last_over(&self, index: usize) -> Result<()> {
        self.store.borrow_mut().move_last_over(&self.name, index)
    }

    /// Returns a handle to the table a link column points to.
    pub fn link_target(&self, col: usize) -> Result<TableHandle> {
        let target = self.with_table(|t| t.link_target(col).map(str::to_string))??;
        Ok(TableHandle::new(self.store.clone(), target))
    }

    /// Returns whether both tables' live schemas are structurally equal.
    /// False if either table no longer exists.
    pub fn has_same_schema(&self, other: &TableHandle) -> bool {
        match (self.spec(), other.spec()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_def() -> TableDef {
        TableBuilder::new("Person")
            .unwrap()
            .add_column("name", ColumnType::String)
            .unwrap()
            .add_column("age", ColumnType::Integer)
            .unwrap()
            .build()
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = TableBuilder::new("Person")
            .unwrap()
            .add_column("name", ColumnType::String)
            .unwrap()
            .add_column("name", ColumnType::Integer);
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_invalid_names() {
        assert!(TableBuilder::new("123abc").is_err());
        assert!(TableBuilder::new("").is_err());
        let result = TableBuilder::new("Person")
            .unwrap()
            .add_column("has space", ColumnType::String);
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_routes_special_columns() {
        let result = TableBuilder::new("Person")
            .unwrap()
            .add_column("friend", ColumnType::Link);
        assert!(result.is_err());
        let result = TableBuilder::new("Person")
            .unwrap()
            .add_column("extra", ColumnType::Mixed);
        assert!(result.is_err());
    }

    #[test]
    fn test_prefixed_def() {
        let def = TableBuilder::new("Person")
            .unwrap()
            .add_link("spouse", "Person")
            .unwrap()
            .build()
            .prefixed(TABLE_PREFIX);
        assert_eq!(def.name(), "class_Person");
        assert_eq!(def.columns[0].link_target(), Some("class_Person"));
    }

    #[test]
    fn test_strip_table_prefix() {
        assert_eq!(strip_table_prefix("class_Person"), "Person");
        assert_eq!(strip_table_prefix("Person"), "Person");
    }

    #[test]
    fn test_store_column_lookup() {
        let table = TableStore::new(person_def());
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column_index("name").unwrap(), 0);
        assert_eq!(table.column_index("age").unwrap(), 1);
        assert_eq!(table.column_name(1).unwrap(), "age");
        assert_eq!(table.column_type(0).unwrap(), ColumnType::String);
        assert!(matches!(
            table.column_index("missing"),
            Err(Error::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_store_typed_access() {
        let mut table = TableStore::new(person_def());
        let (row, _) = table.add_row();
        assert_eq!(table.get_string(0, row).unwrap(), "");
        assert_eq!(table.get_long(1, row).unwrap(), 0);

        table.set_string(0, row, "Alice".into()).unwrap();
        table.set_long(1, row, 42).unwrap();
        assert_eq!(table.get_string(0, row).unwrap(), "Alice");
        assert_eq!(table.get_long(1, row).unwrap(), 42);
    }

    #[test]
    fn test_store_type_mismatch() {
        let mut table = TableStore::new(person_def());
        let (row, _) = table.add_row();
        assert!(matches!(
            table.get_long(0, row),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            table.set_bool(1, row, true),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_store_tagged_value_access() {
        let mut table = TableStore::new(person_def());
        let (row, _) = table.add_row();
        assert_eq!(table.get_value(0, row).unwrap(), Some(Value::Str("".into())));

        table.set_value(1, row, Value::Int(7)).unwrap();
        assert_eq!(table.get_value(1, row).unwrap(), Some(Value::Int(7)));
        assert!(matches!(
            table.set_value(1, row, Value::Bool(true)),
            Err(Error::TypeMismatch { .. })
        ));

        let def = TableBuilder::new("Linked")
            .unwrap()
            .add_link("next", "Linked")
            .unwrap()
            .build();
        let mut linked = TableStore::new(def);
        let (row, _) = linked.add_row();
        assert_eq!(linked.get_value(0, row).unwrap(), None);
    }

    #[test]
    fn test_store_link_storage() {
        let def = TableBuilder::new("Person")
            .unwrap()
            .add_link("spouse", "Person")
            .unwrap()
            .add_link_list("friends", "Person")
            .unwrap()
            .build();
        let mut table = TableStore::new(def);
        let (a, _) = table.add_row();
        let (b, _) = table.add_row();

        assert!(table.is_null_link(0, a).unwrap());
        table.set_link(0, a, b).unwrap();
        assert!(!table.is_null_link(0, a).unwrap());
        assert_eq!(table.get_link(0, a).unwrap(), Some(b));
        table.nullify_link(0, a).unwrap();
        assert_eq!(table.get_link(0, a).unwrap(), None);

        assert_eq!(table.list_len(1, a).unwrap(), 0);
        table.list_add(1, a, b).unwrap();
        table.list_add(1, a, b).unwrap();
        assert_eq!(table.list_len(1, a).unwrap(), 2);
        assert_eq!(table.list_get(1, a, 1).unwrap(), b);
        table.list_clear(1, a).unwrap();
        assert_eq!(table.list_len(1, a).unwrap(), 0);

        // A link list is never null; scalar columns never report null.
        assert!(!table.is_null_link(1, a).unwrap());
    }

    #[test]
    fn test_move_last_over_relocates_last_row() {
        let mut table = TableStore::new(person_def());
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let (row, _) = table.add_row();
            table.set_string(0, row, (*name).into()).unwrap();
            table.set_long(1, row, i as i64).unwrap();
        }
        let last_id = table.row_id(2).unwrap();

        table.move_last_over(0).unwrap();
        assert_eq!(table.row_count(), 2);
        // Row "c" now occupies slot 0, identity preserved.
        assert_eq!(table.get_string(0, 0).unwrap(), "c");
        assert_eq!(table.row_id(0).unwrap(), last_id);
        assert_eq!(table.get_string(0, 1).unwrap(), "b");

        assert!(table.move_last_over(5).is_err());
    }

    #[test]
    fn test_spec_mirrors_columns() {
        let mut sub = TableSpec::new();
        sub.add_column(ColumnType::Integer, "x");
        let def = TableBuilder::new("Person")
            .unwrap()
            .add_column("name", ColumnType::String)
            .unwrap()
            .add_table("address", sub.clone())
            .unwrap()
            .add_link("spouse", "Person")
            .unwrap()
            .build();
        let table = TableStore::new(def);
        let spec = table.spec();
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.get(0).unwrap().column_type(), ColumnType::String);
        assert_eq!(spec.sub_spec(1).unwrap(), &sub);
        // Link columns carry no sub-spec in the live schema.
        assert!(spec.sub_spec(2).is_none());
    }

    #[test]
    fn test_list_get_out_of_bounds() {
        let def = TableBuilder::new("Person")
            .unwrap()
            .add_link_list("friends", "Person")
            .unwrap()
            .build();
        let mut table = TableStore::new(def);
        let (row, _) = table.add_row();
        table.list_add(0, row, 0).unwrap();
        assert!(matches!(
            table.list_get(0, row, 3),
            Err(Error::IndexOutOfBounds { index: 3, size: 1 })
        ));
    }
}
