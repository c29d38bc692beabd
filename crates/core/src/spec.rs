//! Recursive table-shape model for the Opal object database.
//!
//! A `TableSpec` is the ordered column definition shared by all rows of a
//! table. Columns of type `Table` recursively own a child spec, so a spec is
//! a tree of immutable value nodes. Every nested spec is created fresh when
//! its column is added and is never shared back to an ancestor, which keeps
//! the graph acyclic and makes recursive structural equality terminate.
//!
//! Link and link-list columns carry no sub-spec here: a self-referencing
//! link column would otherwise introduce a cycle. Their target schema lives
//! on the live table and is compared through `has_same_schema`.

use crate::types::ColumnType;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// A single column definition: name, storage type, and the nested sub-spec
/// owned by `Table` columns.
#[derive(Clone, Debug)]
pub struct ColumnSpec {
    name: String,
    ty: ColumnType,
    sub: Option<TableSpec>,
}

impl ColumnSpec {
    /// Creates a column spec. `Table` columns get a fresh empty sub-spec.
    pub fn new(ty: ColumnType, name: impl Into<String>) -> Self {
        let sub = if ty.has_sub_spec() {
            Some(TableSpec::new())
        } else {
            None
        };
        Self {
            name: name.into(),
            ty,
            sub,
        }
    }

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

    /// Returns the nested sub-spec, if this is a `Table` column.
    #[inline]
    pub fn sub_spec(&self) -> Option<&TableSpec> {
        self.sub.as_ref()
    }

    /// Returns a mutable reference to the nested sub-spec.
    #[inline]
    pub fn sub_spec_mut(&mut self) -> Option<&mut TableSpec> {
        self.sub.as_mut()
    }

    /// Creates a `Table` column carrying an already-built sub-spec.
    ///
    /// Used by the storage layer when mirroring a live table's schema.
    pub fn table(name: impl Into<String>, sub: TableSpec) -> Self {
        Self {
            name: name.into(),
            ty: ColumnType::Table,
            sub: Some(sub),
        }
    }
}

impl PartialEq for ColumnSpec {
    fn eq(&self, other: &Self) -> bool {
        // Structural, recursive: absent vs. present sub-spec is unequal.
        self.name == other.name
            && self.ty == other.ty
            && match (&self.sub, &other.sub) {
                (None, None) => true,
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }
}

impl Eq for ColumnSpec {}

/// An ordered sequence of column definitions.
///
/// Column order is significant: index `i` always denotes the `i`-th column
/// in declaration order. Equality is structural and recursive, with no
/// identity shortcut, because it is used to detect schema drift between
/// declared model shapes and runtime schemas.
#[derive(Clone, Debug, Default)]
pub struct TableSpec {
    columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Appends a column. `Table` columns receive a fresh empty sub-spec,
    /// reachable through [`TableSpec::sub_spec_mut`].
    ///
    /// Duplicate names are not rejected at this level; index lookup is
    /// first-match-wins. The storage-layer builder enforces uniqueness.
    pub fn add_column(&mut self, ty: ColumnType, name: &str) -> &mut Self {
        self.columns.push(ColumnSpec::new(ty, name));
        self
    }

    /// Appends an already-built column.
    pub fn push(&mut self, column: ColumnSpec) {
        self.columns.push(column);
    }

    /// Returns the number of columns.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the spec has no columns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column at `index`.
    pub fn get(&self, index: usize) -> Option<&ColumnSpec> {
        self.columns.get(index)
    }

    /// Returns all columns in declaration order.
    #[inline]
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Returns the first column index with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Returns the nested spec of the `Table` column at `index`.
    pub fn sub_spec(&self, index: usize) -> Option<&TableSpec> {
        self.columns.get(index).and_then(|c| c.sub_spec())
    }

    /// Returns a mutable reference to the nested spec of the `Table`
    /// column at `index`, enabling deep construction:
    ///
    /// ```
    /// use opal_core::{ColumnType, TableSpec};
    ///
    /// let mut spec = TableSpec::new();
    /// spec.add_column(ColumnType::String, "foo");
    /// spec.add_column(ColumnType::Table, "bar");
    /// spec.sub_spec_mut(1)
    ///     .unwrap()
    ///     .add_column(ColumnType::Integer, "x");
    /// assert_eq!(spec.sub_spec(1).unwrap().len(), 1);
    /// ```
    pub fn sub_spec_mut(&mut self, index: usize) -> Option<&mut TableSpec> {
        self.columns.get_mut(index).and_then(|c| c.sub_spec_mut())
    }
}

impl PartialEq for TableSpec {
    fn eq(&self, other: &Self) -> bool {
        if self.columns.len() != other.columns.len() {
            return false;
        }
        self.columns
            .iter()
            .zip(other.columns.iter())
            .all(|(a, b)| a == b)
    }
}

impl Eq for TableSpec {}

impl core::fmt::Display for TableSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[")?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", col.name(), col.column_type())?;
            if let Some(sub) = col.sub_spec() {
                write!(f, " {}", sub)?;
            }
        }
        write!(f, "]")
    }
}
