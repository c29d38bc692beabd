//! Dynamic by-name object access.
//!
//! A `DynamicObject` pairs a row handle with its owning database instance
//! and exposes the generic-field API: typed getters and setters resolved by
//! field name, link traversal, deletion, and structural rendering. Every
//! by-name accessor resolves the field to a column index first and then
//! dispatches strictly on the column's declared type.

use crate::database::Database;
use crate::list::DynamicList;
use core::fmt;
use core::fmt::Write as _;
use core::hash::{Hash, Hasher};
use opal_core::{ColumnType, Error, Result, Value};
use opal_storage::{strip_table_prefix, RowHandle};

/// A dynamically-typed view of one object.
#[derive(Clone)]
pub struct DynamicObject {
    db: Database,
    row: RowHandle,
}

impl DynamicObject {
    pub(crate) fn new(db: Database, row: RowHandle) -> Self {
        Self { db, row }
    }

    /// Returns the owning database instance.
    #[inline]
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn row(&self) -> &RowHandle {
        &self.row
    }

    /// Returns whether the underlying row is still attached.
    pub fn is_valid(&self) -> bool {
        self.row.is_attached()
    }

    /// Resolves `field` and checks its declared type against `expected`.
    fn typed_index(&self, field: &str, expected: ColumnType) -> Result<usize> {
        let col = self.row.column_index(field)?;
        let ty = self.row.column_type(col)?;
        if ty != expected {
            return Err(Error::type_mismatch(field, expected, ty));
        }
        Ok(col)
    }

    // ----- typed getters -----

    pub fn get_boolean(&self, field: &str) -> Result<bool> {
        let col = self.typed_index(field, ColumnType::Boolean)?;
        self.row.get_bool(col)
    }

    pub fn get_long(&self, field: &str) -> Result<i64> {
        let col = self.typed_index(field, ColumnType::Integer)?;
        self.row.get_long(col)
    }

    /// Narrowing read of an integer column. Out-of-range values wrap with
    /// two's-complement truncation rather than fail.
    pub fn get_int(&self, field: &str) -> Result<i32> {
        self.get_long(field).map(|v| v as i32)
    }

    pub fn get_short(&self, field: &str) -> Result<i16> {
        self.get_long(field).map(|v| v as i16)
    }

    pub fn get_byte(&self, field: &str) -> Result<i8> {
        self.get_long(field).map(|v| v as i8)
    }

    pub fn get_float(&self, field: &str) -> Result<f32> {
        let col = self.typed_index(field, ColumnType::Float)?;
        self.row.get_float(col)
    }

    pub fn get_double(&self, field: &str) -> Result<f64> {
        let col = self.typed_index(field, ColumnType::Double)?;
        self.row.get_double(col)
    }

    pub fn get_string(&self, field: &str) -> Result<String> {
        let col = self.typed_index(field, ColumnType::String)?;
        self.row.get_string(col)
    }

    pub fn get_binary(&self, field: &str) -> Result<Vec<u8>> {
        let col = self.typed_index(field, ColumnType::Binary)?;
        self.row.get_binary(col)
    }

    /// Reads a date column as milliseconds since the epoch.
    pub fn get_date(&self, field: &str) -> Result<i64> {
        let col = self.typed_index(field, ColumnType::Date)?;
        self.row.get_date(col)
    }

    // ----- typed setters -----

    pub fn set_boolean(&self, field: &str, value: bool) -> Result<()> {
        let col = self.typed_index(field, ColumnType::Boolean)?;
        self.row.set_bool(col, value)
    }

    pub fn set_long(&self, field: &str, value: i64) -> Result<()> {
        let col = self.typed_index(field, ColumnType::Integer)?;
        self.row.set_long(col, value)
    }

    pub fn set_int(&self, field: &str, value: i32) -> Result<()> {
        self.set_long(field, value as i64)
    }

    pub fn set_short(&self, field: &str, value: i16) -> Result<()> {
        self.set_long(field, value as i64)
    }

    pub fn set_byte(&self, field: &str, value: i8) -> Result<()> {
        self.set_long(field, value as i64)
    }

    pub fn set_float(&self, field: &str, value: f32) -> Result<()> {
        let col = self.typed_index(field, ColumnType::Float)?;
        self.row.set_float(col, value)
    }

    pub fn set_double(&self, field: &str, value: f64) -> Result<()> {
        let col = self.typed_index(field, ColumnType::Double)?;
        self.row.set_double(col, value)
    }

    pub fn set_string(&self, field: &str, value: impl Into<String>) -> Result<()> {
        let col = self.typed_index(field, ColumnType::String)?;
        self.row.set_string(col, value.into())
    }

    pub fn set_binary(&self, field: &str, value: Vec<u8>) -> Result<()> {
        let col = self.typed_index(field, ColumnType::Binary)?;
        self.row.set_binary(col, value)
    }

    pub fn set_date(&self, field: &str, value: i64) -> Result<()> {
        let col = self.typed_index(field, ColumnType::Date)?;
        self.row.set_date(col, value)
    }

    /// Reads any scalar field as a tagged value. Link, list, nested-table
    /// and mixed columns have no scalar representation and read as `None`.
    pub fn get_value(&self, field: &str) -> Result<Option<Value>> {
        let col = self.row.column_index(field)?;
        self.row.get_value(col)
    }

    /// Writes a scalar field from a tagged value whose type must match the
    /// column's declared type.
    pub fn set_value(&self, field: &str, value: Value) -> Result<()> {
        let col = self.row.column_index(field)?;
        self.row.set_value(col, value)
    }

    /// Nullifies a link column. Primitive columns store no null, so any
    /// other column kind is rejected.
    pub fn set_null(&self, field: &str) -> Result<()> {
        let col = self.row.column_index(field)?;
        match self.row.column_type(col)? {
            ColumnType::Link => self.row.nullify_link(col),
            _ => Err(Error::illegal_null(field)),
        }
    }

    // ----- link access -----

    /// Returns the linked object, or `None` when the link is null.
    pub fn get_object(&self, field: &str) -> Result<Option<DynamicObject>> {
        let col = self.typed_index(field, ColumnType::Link)?;
        match self.row.get_link(col)? {
            None => Ok(None),
            Some(target_row) => {
                let target = self.row.link_target(col)?;
                let row = target.row(target_row)?;
                Ok(Some(DynamicObject::new(self.db.clone(), row)))
            }
        }
    }

    /// Stores a link to `other`, or nullifies the link for `None`.
    ///
    /// `other` must be attached, belong to this database instance, and its
    /// table's live schema must structurally match the column's link
    /// target.
    pub fn set_object(&self, field: &str, other: Option<&DynamicObject>) -> Result<()> {
        let col = self.typed_index(field, ColumnType::Link)?;
        let other = match other {
            None => return self.row.nullify_link(col),
            Some(other) => other,
        };
        let target_row = other.row.index()?;
        if !self.db.same_instance(&other.db) {
            return Err(Error::CrossDatabaseLink);
        }
        let expected = self.row.link_target(col)?;
        let got = other.row.table()?;
        if !expected.has_same_schema(&got) {
            return Err(Error::schema_mismatch(expected.name(), got.name()));
        }
        self.row.set_link(col, target_row)
    }

    /// Returns a live view of the column's link list.
    pub fn get_list(&self, field: &str) -> Result<DynamicList> {
        let col = self.typed_index(field, ColumnType::LinkList)?;
        Ok(DynamicList::new(self.db.clone(), self.row.clone(), col))
    }

    /// Clears the link list then appends each object in order.
    ///
    /// A failure mid-iteration leaves the list partially updated; see
    /// [`DynamicObject::set_list_atomic`] for the all-or-nothing variant.
    pub fn set_list(&self, field: &str, objects: &[DynamicObject]) -> Result<()> {
        let list = self.get_list(field)?;
        list.clear()?;
        for obj in objects {
            list.add(obj)?;
        }
        Ok(())
    }

    /// Like [`DynamicObject::set_list`], but validates every element before
    /// touching the stored list.
    pub fn set_list_atomic(&self, field: &str, objects: &[DynamicObject]) -> Result<()> {
        let list = self.get_list(field)?;
        for obj in objects {
            list.validate(obj)?;
        }
        list.clear()?;
        for obj in objects {
            list.add(obj)?;
        }
        Ok(())
    }

    /// Null test. Only a null link column reports true; link lists and
    /// scalar columns never report null through this call.
    pub fn is_null(&self, field: &str) -> Result<bool> {
        let col = self.row.column_index(field)?;
        self.row.is_null_link(col)
    }

    // ----- introspection -----

    /// Returns whether a field with the given name exists. Never fails;
    /// empty names and detached rows report false.
    pub fn has_field(&self, field: &str) -> bool {
        !field.is_empty() && self.row.has_column(field)
    }

    /// Returns all field names in schema order.
    pub fn field_names(&self) -> Result<Vec<String>> {
        let count = self.row.column_count()?;
        let mut names = Vec::with_capacity(count);
        for col in 0..count {
            names.push(self.row.column_name(col)?);
        }
        Ok(names)
    }

    /// Returns the declared type of a field.
    pub fn field_type(&self, field: &str) -> Result<ColumnType> {
        let col = self.row.column_index(field)?;
        self.row.column_type(col)
    }

    /// Returns the owning table's logical name.
    pub fn type_name(&self) -> Result<String> {
        if !self.row.is_attached() {
            return Err(Error::InvalidObject);
        }
        Ok(strip_table_prefix(self.row.table_name()).to_string())
    }

    /// Deletes the underlying row by move-last-over and detaches this
    /// accessor. Further field access fails with an invalid-object error.
    pub fn delete(&mut self) -> Result<()> {
        let index = self.row.index()?;
        self.row.table()?.move_last_over(index)?;
        self.row.invalidate();
        Ok(())
    }

    fn render(&self) -> Result<String> {
        let table = self.row.table()?;
        let mut out = format!("{} = [", table.name());
        let count = self.row.column_count()?;
        for col in 0..count {
            let field = self.row.column_name(col)?;
            out.push('{');
            match self.row.column_type(col)? {
                ColumnType::Boolean
                | ColumnType::Integer
                | ColumnType::Float
                | ColumnType::Double
                | ColumnType::String
                | ColumnType::Binary
                | ColumnType::Date => {
                    if let Some(value) = self.row.get_value(col)? {
                        write_cell(&mut out, &field, value);
                    }
                }
                ColumnType::Link => {
                    // Null links render bare, without the field name.
                    if self.row.is_null_link(col)? {
                        out.push_str("null");
                    } else {
                        write_cell(&mut out, &field, self.row.link_target(col)?.name());
                    }
                }
                ColumnType::LinkList => {
                    let target = self.row.link_target(col)?;
                    let _ = write!(
                        out,
                        "{}: List<{}>[{}]",
                        field,
                        target.name(),
                        self.row.list_len(col)?
                    );
                }
                ColumnType::Table | ColumnType::Mixed => {
                    let _ = write!(out, "{}: ?", field);
                }
            }
            out.push_str("}, ");
        }
        if count > 0 {
            out.truncate(out.len() - 2);
        }
        out.push(']');
        Ok(out)
    }
}

fn write_cell(out: &mut String, field: &str, value: impl fmt::Display) {
    let _ = write!(out, "{}: {}", field, value);
}

impl fmt::Display for DynamicObject {
    /// Structural rendering; degrades to a fixed marker when the row is no
    /// longer attached instead of failing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("Invalid object"),
        }
    }
}

impl fmt::Debug for DynamicObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn identity(obj: &DynamicObject) -> (&str, (&str, usize, u64)) {
    (obj.db.path(), obj.row.binding())
}

impl PartialEq for DynamicObject {
    /// Equality over (database path, table name, row index), independent
    /// of accessor identity. The row identity is part of the comparison,
    /// so invalidated accessors over different former rows stay distinct.
    fn eq(&self, other: &Self) -> bool {
        identity(self) == identity(other)
    }
}

impl Eq for DynamicObject {}

impl Hash for DynamicObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        identity(self).hash(state);
    }
}
