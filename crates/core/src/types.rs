//! Column type definitions for the Opal object database.
//!
//! This module defines the closed set of storage types a column can hold.

/// Storage types a table column can hold.
///
/// This is a closed enumeration: getters, setters and display code dispatch
/// over it with exhaustive matches, so adding a storage type is a
/// compile-time-checked, single-point change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Boolean (true/false)
    Boolean,
    /// 64-bit signed integer
    Integer,
    /// 32-bit floating point number
    Float,
    /// 64-bit floating point number
    Double,
    /// UTF-8 string
    String,
    /// Binary data
    Binary,
    /// Date and time stored as Unix timestamp (milliseconds)
    Date,
    /// Reference to at most one row in a target table
    Link,
    /// Ordered, duplicate-permitting sequence of links to a target table
    LinkList,
    /// Nested sub-table
    Table,
    /// Heterogeneous value; has no dynamic representation
    Mixed,
}

impl ColumnType {
    /// Returns whether this type references rows in another table.
    #[inline]
    pub fn is_link_kind(&self) -> bool {
        matches!(self, ColumnType::Link | ColumnType::LinkList)
    }

    /// Returns whether columns of this type own a nested sub-spec.
    #[inline]
    pub fn has_sub_spec(&self) -> bool {
        matches!(self, ColumnType::Table)
    }

    /// Returns whether the dynamic layer can read or write this type.
    ///
    /// `Table` and `Mixed` columns can be enumerated and displayed but carry
    /// no per-row payload in the dynamic path.
    #[inline]
    pub fn is_readable(&self) -> bool {
        !matches!(self, ColumnType::Table | ColumnType::Mixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_identity() {
        assert_eq!(ColumnType::Integer, ColumnType::Integer);
        assert_ne!(ColumnType::Integer, ColumnType::Double);
        assert_ne!(ColumnType::Link, ColumnType::LinkList);
    }

    #[test]
    fn test_link_kinds() {
        assert!(ColumnType::Link.is_link_kind());
        assert!(ColumnType::LinkList.is_link_kind());
        assert!(!ColumnType::String.is_link_kind());
        assert!(!ColumnType::Table.is_link_kind());
    }

    #[test]
    fn test_sub_spec_owners() {
        assert!(ColumnType::Table.has_sub_spec());
        assert!(!ColumnType::Link.has_sub_spec());
        assert!(!ColumnType::Mixed.has_sub_spec());
    }

    #[test]
    fn test_readability() {
        assert!(ColumnType::Boolean.is_readable());
        assert!(ColumnType::LinkList.is_readable());
        assert!(!ColumnType::Table.is_readable());
        assert!(!ColumnType::Mixed.is_readable());
    }
}
