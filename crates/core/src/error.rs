//! Error types for the Opal object database.

use crate::types::ColumnType;
use alloc::string::String;
use core::fmt;

/// Result type alias for Opal operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Opal data-access operations.
///
/// All of these are local, synchronous, recoverable-by-caller errors; none
/// are retried internally, and no accessor silently substitutes a default
/// in place of raising one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Field name absent from the bound schema.
    FieldNotFound {
        table: String,
        field: String,
    },
    /// Declared column type disagrees with the requested accessor kind.
    TypeMismatch {
        field: String,
        expected: ColumnType,
        got: ColumnType,
    },
    /// Attempt to null a non-nullable primitive column.
    IllegalNull {
        field: String,
    },
    /// Link write whose target row belongs to a different database instance.
    CrossDatabaseLink,
    /// Linked object's table schema does not match the expected link target.
    SchemaMismatch {
        expected: String,
        got: String,
    },
    /// Field access after the row has been invalidated.
    InvalidObject,
    /// Table absent from the database instance.
    TableNotFound {
        name: String,
    },
    /// Row or list position out of range.
    IndexOutOfBounds {
        index: usize,
        size: usize,
    },
    /// Invalid schema definition.
    InvalidSchema {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FieldNotFound { table, field } => {
                write!(f, "Field {} not found in table {}", field, table)
            }
            Error::TypeMismatch {
                field,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Type mismatch on field {}: expected {:?}, got {:?}",
                    field, expected, got
                )
            }
            Error::IllegalNull { field } => {
                write!(f, "Field {} is not nullable", field)
            }
            Error::CrossDatabaseLink => {
                write!(f, "Cannot link to an object from another database")
            }
            Error::SchemaMismatch { expected, got } => {
                write!(
                    f,
                    "Type of object is wrong. Was {}, expected {}",
                    got, expected
                )
            }
            Error::InvalidObject => {
                write!(f, "Object is no longer valid to operate on")
            }
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::IndexOutOfBounds { index, size } => {
                write!(f, "Index {} out of bounds (size {})", index, size)
            }
            Error::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a field not found error.
    pub fn field_not_found(table: impl Into<String>, field: impl Into<String>) -> Self {
        Error::FieldNotFound {
            table: table.into(),
            field: field.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(field: impl Into<String>, expected: ColumnType, got: ColumnType) -> Self {
        Error::TypeMismatch {
            field: field.into(),
            expected,
            got,
        }
    }

    /// Creates an illegal null error.
    pub fn illegal_null(field: impl Into<String>) -> Self {
        Error::IllegalNull {
            field: field.into(),
        }
    }

    /// Creates a schema mismatch error naming both tables.
    pub fn schema_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates an index out of bounds error.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Error::IndexOutOfBounds { index, size }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::field_not_found("class_Person", "age");
        assert!(err.to_string().contains("age"));
        assert!(err.to_string().contains("class_Person"));

        let err = Error::type_mismatch("age", ColumnType::Integer, ColumnType::String);
        assert!(err.to_string().contains("Type mismatch"));

        let err = Error::schema_mismatch("class_Person", "class_Dog");
        assert!(err.to_string().contains("class_Person"));
        assert!(err.to_string().contains("class_Dog"));

        assert!(Error::InvalidObject.to_string().contains("no longer valid"));
    }

    #[test]
    fn test_error_constructors() {
        match Error::index_out_of_bounds(5, 3) {
            Error::IndexOutOfBounds { index, size } => {
                assert_eq!(index, 5);
                assert_eq!(size, 3);
            }
            _ => panic!("Wrong error type"),
        }

        match Error::illegal_null("name") {
            Error::IllegalNull { field } => assert_eq!(field, "name"),
            _ => panic!("Wrong error type"),
        }
    }
}
