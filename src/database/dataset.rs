//! In-memory tabular data decoded from an upload.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::compute::kernels::cast::{can_cast_types, cast};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use super::errors::{DatabaseError, DbResult};

/// Named columns plus rows, held as Arrow record batches.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Dataset {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Recast every column to its [`StagedType`] and split the batches so
    /// none is longer than `max_rows`.
    ///
    /// The engine does the final conversion into the target table's column
    /// types, so a value the target cannot hold fails there, not here.
    pub(crate) fn staged(&self, max_rows: usize) -> DbResult<Staged> {
        let types = self
            .schema
            .fields()
            .iter()
            .map(|f| StagedType::for_column(f.name(), f.data_type()))
            .collect::<DbResult<Vec<_>>>()?;

        let schema = Arc::new(Schema::new(
            self.schema
                .fields()
                .iter()
                .zip(&types)
                .map(|(f, t)| Field::new(f.name(), t.arrow_type(), true))
                .collect::<Vec<_>>(),
        ));

        let mut batches = Vec::with_capacity(self.batches.len());
        for batch in &self.batches {
            let columns = batch
                .columns()
                .iter()
                .zip(&types)
                .map(|(array, t)| restage(array, t))
                .collect::<DbResult<Vec<_>>>()?;
            let batch = RecordBatch::try_new(schema.clone(), columns)?;

            let mut offset = 0;
            while offset < batch.num_rows() {
                let len = max_rows.min(batch.num_rows() - offset);
                batches.push(batch.slice(offset, len));
                offset += len;
            }
        }

        Ok(Staged { types, batches })
    }
}

/// A dataset recast for the engine's appender
pub(crate) struct Staged {
    pub types: Vec<StagedType>,
    pub batches: Vec<RecordBatch>,
}

/// Column type of the transient relation an upload is staged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StagedType {
    BigInt,
    Double,
    Boolean,
    Varchar,
}

impl StagedType {
    fn for_column(name: &str, data_type: &DataType) -> DbResult<Self> {
        let staged = match data_type {
            DataType::Boolean => StagedType::Boolean,
            dt if dt.is_integer() => StagedType::BigInt,
            dt if dt.is_floating()
                || matches!(dt, DataType::Decimal128(_, _) | DataType::Decimal256(_, _)) =>
            {
                StagedType::Double
            }
            dt if can_cast_types(dt, &DataType::Utf8) => StagedType::Varchar,
            other => {
                return Err(DatabaseError::UnsupportedColumn {
                    column: name.to_string(),
                    data_type: other.to_string(),
                })
            }
        };
        Ok(staged)
    }

    fn arrow_type(self) -> DataType {
        match self {
            StagedType::BigInt => DataType::Int64,
            StagedType::Double => DataType::Float64,
            StagedType::Boolean => DataType::Boolean,
            StagedType::Varchar => DataType::Utf8,
        }
    }

    pub(crate) fn sql(self) -> &'static str {
        match self {
            StagedType::BigInt => "BIGINT",
            StagedType::Double => "DOUBLE",
            StagedType::Boolean => "BOOLEAN",
            StagedType::Varchar => "VARCHAR",
        }
    }
}

fn restage(array: &ArrayRef, staged: &StagedType) -> DbResult<ArrayRef> {
    let target = staged.arrow_type();
    if array.data_type() == &target {
        return Ok(array.clone());
    }
    let array: &dyn Array = array.as_ref();
    Ok(cast(array, &target)?)
}
