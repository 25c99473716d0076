//! Uploaded files: format detection, decoding, and the release guard.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use arrow::csv::reader::{Format, ReaderBuilder};
use arrow::record_batch::RecordBatch;
use axum::body::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::errors::{GatewayError, GatewayResult};
use crate::database::Dataset;
use crate::observability::Logger;

/// Tabular formats accepted for bulk upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Parquet,
}

impl UploadFormat {
    /// Pick the format from the file name suffix alone.
    pub fn from_file_name(file_name: &str) -> GatewayResult<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(UploadFormat::Csv)
        } else if lower.ends_with(".parquet") {
            Ok(UploadFormat::Parquet)
        } else {
            Err(GatewayError::UnsupportedFormat)
        }
    }

    /// Decode file contents into a dataset.
    pub fn decode(self, contents: &Bytes) -> GatewayResult<Dataset> {
        let dataset = match self {
            UploadFormat::Csv => decode_csv(contents)?,
            UploadFormat::Parquet => decode_parquet(contents)?,
        };

        if dataset.num_columns() == 0 {
            return Err(GatewayError::Parse(
                "uploaded file contains no columns".to_string(),
            ));
        }
        Ok(dataset)
    }
}

fn parse_error(err: impl fmt::Display) -> GatewayError {
    GatewayError::Parse(err.to_string())
}

fn decode_csv(contents: &Bytes) -> GatewayResult<Dataset> {
    let format = Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(Cursor::new(contents.as_ref()), None)
        .map_err(parse_error)?;
    let schema = Arc::new(schema);

    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .build(Cursor::new(contents.as_ref()))
        .map_err(parse_error)?;
    let batches = reader
        .collect::<Result<Vec<RecordBatch>, _>>()
        .map_err(parse_error)?;

    Ok(Dataset::new(schema, batches))
}

fn decode_parquet(contents: &Bytes) -> GatewayResult<Dataset> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(contents.clone()).map_err(parse_error)?;
    let schema = builder.schema().clone();

    let reader = builder.build().map_err(parse_error)?;
    let batches = reader
        .collect::<Result<Vec<RecordBatch>, _>>()
        .map_err(parse_error)?;

    Ok(Dataset::new(schema, batches))
}

/// An uploaded file owned for the duration of one request.
///
/// Released exactly once, when dropped, whichever way the upload ends.
pub struct UploadedFile {
    file_name: String,
    contents: Bytes,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, contents: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            contents,
            on_release: None,
        }
    }

    /// Run `hook` when the file is released
    pub fn with_release_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("len", &self.contents.len())
            .finish()
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        let size = self.contents.len().to_string();
        self.contents = Bytes::new();
        Logger::info(
            "UPLOAD_RELEASED",
            &[("file", self.file_name.as_str()), ("bytes", size.as_str())],
        );
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}
