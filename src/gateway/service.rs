//! The request translator: validated, parameterized database operations.

use serde_json::{Map, Value};

use super::errors::{GatewayError, GatewayResult};
use super::identifier::validate_identifier;
use super::sql;
use super::upload::{UploadFormat, UploadedFile};
use crate::database::{Database, DbResult, RowSet, ScalarValue};
use crate::observability::Logger;

/// Table created at startup when sample bootstrapping is enabled
pub const SAMPLE_TABLE: &str = "test_table";
const SAMPLE_TABLE_COLUMNS: &str = "id INTEGER, value TEXT";

/// Health report
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// Gateway operations over one shared [`Database`].
///
/// Built once at startup and shared by reference with every handler. The
/// service adds no locking or ordering of its own.
pub struct GatewayService {
    db: Database,
}

impl GatewayService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn health(&self) -> Health {
        Health { status: "OK" }
    }

    /// Create `test_table (id INTEGER, value TEXT)` if it does not exist.
    pub fn create_sample_table(&self) -> GatewayResult<()> {
        self.create_table(SAMPLE_TABLE, SAMPLE_TABLE_COLUMNS)
    }

    /// `CREATE TABLE IF NOT EXISTS`; the column spec is passed through as-is.
    pub fn create_table(&self, table: &str, columns: &str) -> GatewayResult<()> {
        validate_identifier(table)?;
        if columns.trim().is_empty() {
            return Err(GatewayError::bad_request("'columns' must not be empty"));
        }

        self.db.execute(&sql::create_table(table, columns), &[])?;
        Logger::info("TABLE_CREATED", &[("table", table)]);
        Ok(())
    }

    /// Insert one row given as an ordered column → value object.
    pub fn insert(&self, table: Option<&str>, row: Option<Map<String, Value>>) -> GatewayResult<()> {
        let (Some(table), Some(row)) = (table, row) else {
            return Err(GatewayError::bad_request(
                "Both 'table_name' and 'data' are required",
            ));
        };
        if row.is_empty() {
            return Err(GatewayError::bad_request("'data' must not be empty"));
        }
        validate_identifier(table)?;

        // one pass keeps the column list and the bound values aligned
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (column, value) in &row {
            validate_identifier(column)?;
            columns.push(column.as_str());
            values.push(ScalarValue::try_from(value.clone())?);
        }

        self.db.execute(&sql::insert_row(table, &columns), &values)?;
        Logger::info(
            "ROW_INSERTED",
            &[("table", table), ("columns", &columns.len().to_string())],
        );
        Ok(())
    }

    /// Run `raw_query`, or `SELECT * FROM table` when no query text is given.
    pub fn query(&self, raw_query: Option<&str>, table: Option<&str>) -> GatewayResult<RowSet> {
        if let Some(table) = table {
            validate_identifier(table)?;
        }

        let sql = match (raw_query.filter(|q| !q.trim().is_empty()), table) {
            (Some(query), _) => query.to_string(),
            (None, Some(table)) => sql::select_all(table),
            (None, None) => return Err(GatewayError::bad_request("A query must be provided")),
        };

        let rows = self.run(&sql, &[])?;
        Ok(rows)
    }

    /// Run caller-supplied SQL with positional parameters, refusing `DROP`.
    pub fn raw_query(&self, sql: &str, params: Vec<Value>) -> GatewayResult<RowSet> {
        if sql.trim().is_empty() {
            return Err(GatewayError::bad_request("Query must not be empty"));
        }
        if sql::is_denied(sql) {
            Logger::warn("RAW_QUERY_REJECTED", &[("reason", "drop")]);
            return Err(GatewayError::Forbidden(
                "DROP statements are not allowed".to_string(),
            ));
        }

        let params = params
            .into_iter()
            .map(ScalarValue::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self.run(sql, &params)?;
        Ok(rows)
    }

    /// Bulk-load an uploaded CSV or Parquet file into an existing table.
    ///
    /// Takes the file by value: it is released when this returns, on every path.
    pub fn upload(&self, table: &str, file: UploadedFile) -> GatewayResult<usize> {
        validate_identifier(table)?;
        let format = UploadFormat::from_file_name(file.file_name())?;
        if file.is_empty() {
            return Err(GatewayError::Parse("uploaded file is empty".to_string()));
        }
        let dataset = format.decode(file.contents())?;

        let rows = self.db.bulk_load(table, &dataset)?;
        Logger::info(
            "UPLOAD_COMPLETE",
            &[
                ("table", table),
                ("file", file.file_name()),
                ("bytes", &file.len().to_string()),
                ("rows", &rows.to_string()),
            ],
        );
        Ok(rows)
    }

    fn run(&self, sql: &str, params: &[ScalarValue]) -> DbResult<RowSet> {
        let rows = self.db.query(sql, params)?;
        Logger::info("QUERY_EXECUTED", &[("rows", &rows.len().to_string())]);
        Ok(rows)
    }

    /// Close the underlying connection
    pub fn close(&self) -> GatewayResult<()> {
        self.db.close()?;
        Ok(())
    }
}
