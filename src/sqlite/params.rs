use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a single `RowValues` into an owned rusqlite `Value`.
///
/// Booleans become 0/1, timestamps are stored as `%F %T%.f` text and JSON as its serialized
/// text, matching how `SQLite` applications usually store them.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Owned `SQLite` parameters, ready to move onto a blocking worker.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(params: &[RowValues]) -> Self {
        Params(params.iter().map(row_value_to_sqlite_value).collect())
    }

    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.0.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn converts_values_for_sqlite_storage() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 600)
            .unwrap();
        let params = Params::convert(&[
            RowValues::Bool(true),
            RowValues::Timestamp(ts),
            RowValues::JSON(json!({"a": 1})),
            RowValues::Null,
        ]);
        assert_eq!(params.0[0], Value::Integer(1));
        assert_eq!(params.0[1], Value::Text("2024-01-02 03:04:05.600".into()));
        assert_eq!(params.0[2], Value::Text(r#"{"a":1}"#.into()));
        assert_eq!(params.0[3], Value::Null);
        assert_eq!(params.as_refs().len(), 4);
    }
}
