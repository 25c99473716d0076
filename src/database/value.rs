//! Scalar values crossing the HTTP/engine boundary.

use arrow::json::{writer::JsonArray, WriterBuilder};
use arrow::record_batch::RecordBatch;
use duckdb::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::errors::DbResult;

/// One result row, keyed by column name in engine column order
pub type Row = Map<String, Value>;

/// Ordered result rows
pub type RowSet = Vec<Row>;

/// A bindable scalar: the only value shapes accepted in row payloads and
/// raw query parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// A JSON array or object where a scalar was required
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected a scalar value (string, number, boolean or null), found {0}")]
pub struct NotScalar(pub &'static str);

impl TryFrom<Value> for ScalarValue {
    type Error = NotScalar;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(ScalarValue::Null),
            Value::Bool(b) => Ok(ScalarValue::Bool(b)),
            Value::Number(n) => Ok(number_to_scalar(&n)),
            Value::String(s) => Ok(ScalarValue::Text(s)),
            Value::Array(_) => Err(NotScalar("an array")),
            Value::Object(_) => Err(NotScalar("an object")),
        }
    }
}

fn number_to_scalar(n: &Number) -> ScalarValue {
    match n.as_i64() {
        Some(i) => ScalarValue::Integer(i),
        // u64 above i64::MAX and all non-integers
        None => ScalarValue::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

impl ToSql for ScalarValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ScalarValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            ScalarValue::Bool(b) => ToSqlOutput::Owned(SqlValue::Boolean(*b)),
            ScalarValue::Integer(i) => ToSqlOutput::Owned(SqlValue::BigInt(*i)),
            ScalarValue::Float(f) => ToSqlOutput::Owned(SqlValue::Double(*f)),
            ScalarValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Render result batches as JSON objects, one per row.
///
/// Keys follow the engine's column order and SQL `NULL` is kept as an
/// explicit `null`. Dates and timestamps come out as ISO-8601 strings.
pub fn rows_from_batches(batches: &[RecordBatch]) -> DbResult<RowSet> {
    if batches.iter().all(|b| b.num_rows() == 0) {
        return Ok(RowSet::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    writer.write_batches(&batches.iter().collect::<Vec<_>>())?;
    writer.finish()?;

    Ok(serde_json::from_slice(&writer.into_inner())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_scalars_accepted() {
        assert_eq!(ScalarValue::try_from(json!(null)).unwrap(), ScalarValue::Null);
        assert_eq!(ScalarValue::try_from(json!(true)).unwrap(), ScalarValue::Bool(true));
        assert_eq!(ScalarValue::try_from(json!(42)).unwrap(), ScalarValue::Integer(42));
        assert_eq!(ScalarValue::try_from(json!(1.5)).unwrap(), ScalarValue::Float(1.5));
        assert_eq!(
            ScalarValue::try_from(json!("x")).unwrap(),
            ScalarValue::Text("x".to_string())
        );
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let v = ScalarValue::try_from(json!(u64::MAX)).unwrap();
        assert!(matches!(v, ScalarValue::Float(_)));
    }

    #[test]
    fn test_non_scalars_rejected() {
        assert_eq!(
            ScalarValue::try_from(json!([1, 2])).unwrap_err(),
            NotScalar("an array")
        );
        assert_eq!(
            ScalarValue::try_from(json!({"a": 1})).unwrap_err(),
            NotScalar("an object")
        );
    }

    #[test]
    fn test_rows_from_batches_keeps_order_and_nulls() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("z", DataType::Int64, false),
            Field::new("a", DataType::Utf8, true),
            Field::new("m", DataType::Float64, false),
            Field::new("b", DataType::Boolean, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![7, 8])),
                Arc::new(StringArray::from(vec![Some("abc"), None])),
                Arc::new(Float64Array::from(vec![2.5, 1.25])),
                Arc::new(BooleanArray::from(vec![true, false])),
            ],
        )
        .unwrap();

        let rows = rows_from_batches(&[batch]).unwrap();
        assert_eq!(
            json!(rows),
            json!([
                {"z": 7, "a": "abc", "m": 2.5, "b": true},
                {"z": 8, "a": null, "m": 1.25, "b": false}
            ])
        );
        let keys: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m", "b"]);
    }

    #[test]
    fn test_no_batches_is_no_rows() {
        assert!(rows_from_batches(&[]).unwrap().is_empty());
    }
}
