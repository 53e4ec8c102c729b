use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Row};

use super::params::Params;
use crate::error::SqlRepoError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a tokio-postgres row at the given index.
///
/// Types without a dedicated variant are read as text.
///
/// # Errors
/// Returns `SqlRepoError::PostgresError` if the column cannot be decoded.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<RowValues, SqlRepoError> {
    let ty = row.columns()[idx].type_();
    let value = match *ty {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| RowValues::Timestamp(v.and_time(chrono::NaiveTime::MIN))),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        _ => row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Build a result set from tokio-postgres rows.
///
/// # Errors
/// Returns `SqlRepoError` if any value cannot be decoded.
pub fn build_result_set(rows: &[Row]) -> Result<ResultSet, SqlRepoError> {
    let mut result_set = ResultSet::with_capacity(rows.len());
    let Some(first) = rows.first() else {
        return Ok(result_set);
    };
    let column_names: Vec<String> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let column_count = column_names.len();
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Run a query on a client (inside or outside a transaction) and collect its rows.
///
/// # Errors
/// Returns `SqlRepoError` if execution or decoding fails.
pub async fn query_on_client(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlRepoError> {
    let converted = Params::convert(params);
    let rows = client.query(query, converted.as_refs()).await?;
    build_result_set(&rows)
}

/// Execute DML on a client and return rows affected.
///
/// # Errors
/// Returns `SqlRepoError` if execution fails or the count does not fit in `usize`.
pub async fn execute_on_client(
    client: &Client,
    query: &str,
    params: &[RowValues],
) -> Result<usize, SqlRepoError> {
    let converted = Params::convert(params);
    let rows = client.execute(query, converted.as_refs()).await?;
    usize::try_from(rows).map_err(|e| {
        SqlRepoError::ExecutionError(format!("postgres affected rows conversion error: {e}"))
    })
}
