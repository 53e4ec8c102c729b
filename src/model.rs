//! Mapping between Rust types and rows.
//!
//! * [`FromValue`] reads one column value (also used for the identifier type of a repository).
//! * [`FromRow`] builds a row type from a [`CustomDbRow`].
//! * [`Model`] describes how a row type is inserted.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlRepoError;
use crate::results::CustomDbRow;
use crate::types::RowValues;

/// Conversion from a single column value.
pub trait FromValue: Sized {
    /// # Errors
    /// Returns `SqlRepoError::ConversionError` when the value has the wrong shape.
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError>;
}

fn mismatch<T>(expected: &str, value: &RowValues) -> Result<T, SqlRepoError> {
    Err(SqlRepoError::ConversionError(format!(
        "expected {expected}, found {}",
        value.kind()
    )))
}

impl FromValue for RowValues {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        match value {
            RowValues::Int(i) => Ok(*i),
            other => mismatch("int", other),
        }
    }
}

macro_rules! narrowing_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        SqlRepoError::ConversionError(format!(
                            "{wide} out of range for {}",
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

narrowing_from_value!(i32, i16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        value
            .as_float()
            .map_or_else(|| mismatch("float", value), Ok)
    }
}

impl FromValue for bool {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        value.as_bool().map_or_else(|| mismatch("bool", value), Ok)
    }
}

impl FromValue for String {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        match value {
            RowValues::Text(s) => Ok(s.clone()),
            other => mismatch("text", other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        value
            .as_timestamp()
            .map_or_else(|| mismatch("timestamp", value), Ok)
    }
}

/// JSON columns come back as text from `SQLite`, so text is parsed too.
impl FromValue for JsonValue {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        match value {
            RowValues::JSON(v) => Ok(v.clone()),
            RowValues::Text(s) => serde_json::from_str(s)
                .map_err(|e| SqlRepoError::ConversionError(format!("invalid json text: {e}"))),
            other => mismatch("json", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        value
            .as_blob()
            .map_or_else(|| mismatch("blob", value), |b| Ok(b.to_vec()))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &RowValues) -> Result<Self, SqlRepoError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl CustomDbRow {
    /// Read a named column as `T`.
    ///
    /// # Errors
    /// `ConversionError` if the column is missing or has the wrong type.
    pub fn try_get<T: FromValue>(&self, column_name: &str) -> Result<T, SqlRepoError> {
        let value = self.get(column_name).ok_or_else(|| {
            SqlRepoError::ConversionError(format!("no column named {column_name:?}"))
        })?;
        T::from_value(value).map_err(|e| match e {
            SqlRepoError::ConversionError(msg) => {
                SqlRepoError::ConversionError(format!("column {column_name:?}: {msg}"))
            }
            other => other,
        })
    }

    /// Read a column by position as `T`.
    ///
    /// # Errors
    /// `ConversionError` if the index is out of bounds or the value has the wrong type.
    pub fn try_get_index<T: FromValue>(&self, index: usize) -> Result<T, SqlRepoError> {
        let value = self.get_by_index(index).ok_or_else(|| {
            SqlRepoError::ConversionError(format!("no column at index {index}"))
        })?;
        T::from_value(value)
    }
}

/// A type that can be built from a result row.
///
/// ```rust
/// use sql_repository::prelude::*;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &CustomDbRow) -> Result<Self, SqlRepoError> {
///         Ok(User {
///             id: row.try_get("id")?,
///             name: row.try_get("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// # Errors
    /// Returns `SqlRepoError::ConversionError` when a column is missing or mistyped.
    fn from_row(row: &CustomDbRow) -> Result<Self, SqlRepoError>;
}

impl FromRow for CustomDbRow {
    fn from_row(row: &CustomDbRow) -> Result<Self, SqlRepoError> {
        Ok(row.clone())
    }
}

/// A row type the repository can insert.
///
/// `values` lists the columns to write; the database generates the id, which is read back
/// through `RETURNING <ID_COLUMN>`.
pub trait Model {
    const TABLE: &'static str;
    const ID_COLUMN: &'static str = "id";

    fn values(&self) -> Vec<(&'static str, RowValues)>;
}
