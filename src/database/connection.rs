//! The process-wide database handle.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use arrow::record_batch::RecordBatch;
use duckdb::{params_from_iter, Connection};
use uuid::Uuid;

use super::dataset::Dataset;
use super::errors::{DatabaseError, DbResult};
use super::statement::has_trailing_statement;
use super::value::{rows_from_batches, RowSet, ScalarValue};
use crate::observability::Logger;

/// Rows per appended chunk, one engine vector
const APPEND_CHUNK_ROWS: usize = 2048;

/// A single long-lived connection to the on-disk database file.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so the handle sits behind
/// a mutex. The slot is emptied by [`Database::close`]; every later call
/// fails with [`DatabaseError::Closed`].
pub struct Database {
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
}

impl Database {
    /// Open (creating if needed) the database file and its parent directory.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Logger::info("DATABASE_OPENED", &[("path", &path.display().to_string())]);

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            path: None,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Backing file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> DbResult<T>) -> DbResult<T> {
        // a panic mid-statement leaves the connection itself usable
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = guard.as_mut().ok_or(DatabaseError::Closed)?;
        f(conn)
    }

    /// Run one statement with positional `?` parameters, returning the
    /// number of rows it changed.
    pub fn execute(&self, sql: &str, params: &[ScalarValue]) -> DbResult<usize> {
        single_statement(sql)?;
        self.with_connection(|conn| Ok(conn.execute(sql, params_from_iter(params.iter()))?))
    }

    /// Run one statement with positional `?` parameters and collect its rows.
    pub fn query(&self, sql: &str, params: &[ScalarValue]) -> DbResult<RowSet> {
        single_statement(sql)?;
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let batches: Vec<RecordBatch> =
                stmt.query_arrow(params_from_iter(params.iter()))?.collect();
            rows_from_batches(&batches)
        })
    }

    /// Copy `dataset` into `table` through a transient relation.
    ///
    /// `table` must already be a validated identifier. The relation is
    /// created, appended to, drained into `table` and dropped inside a
    /// single transaction; on any failure the transaction rolls back. The
    /// engine converts staged values to the target's column types and
    /// rejects the load if one does not fit.
    pub fn bulk_load(&self, table: &str, dataset: &Dataset) -> DbResult<usize> {
        let relation = format!("upload_{}", Uuid::new_v4().simple());
        let staged = dataset.staged(APPEND_CHUNK_ROWS)?;
        let column_list = dataset
            .column_names()
            .iter()
            .zip(&staged.types)
            .map(|(name, staged_type)| format!("{} {}", quote_identifier(name), staged_type.sql()))
            .collect::<Vec<_>>()
            .join(", ");

        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(&format!("CREATE TABLE {relation} ({column_list})"))?;

            {
                let mut appender = tx.appender(&relation)?;
                for batch in staged.batches {
                    appender.append_record_batch(batch)?;
                }
                appender.flush()?;
            }

            tx.execute_batch(&format!("INSERT INTO {table} SELECT * FROM {relation}"))?;
            tx.execute_batch(&format!("DROP TABLE {relation}"))?;
            tx.commit()?;

            Ok(dataset.num_rows())
        })
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) -> DbResult<()> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(conn) = guard.take() else {
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                Logger::info("DATABASE_CLOSED", &[]);
                Ok(())
            }
            Err((conn, err)) => {
                *guard = Some(conn);
                Err(err.into())
            }
        }
    }
}

/// The engine would run only the first of several statements, so text
/// carrying more than one is refused outright.
fn single_statement(sql: &str) -> DbResult<()> {
    if has_trailing_statement(sql) {
        return Err(DatabaseError::MultipleStatements);
    }
    Ok(())
}

/// Double-quote an arbitrary column name for internal DDL.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn dataset(ids: Vec<i64>, values: Vec<&str>) -> Dataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("value", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(values)),
            ],
        )
        .unwrap();
        Dataset::new(schema, vec![batch])
    }

    fn text_dataset(ids: Vec<&str>) -> Dataset {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Utf8, false)]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(StringArray::from(ids))]).unwrap();
        Dataset::new(schema, vec![batch])
    }

    fn leftover_relations(db: &Database) -> RowSet {
        db.query(
            "SELECT table_name FROM information_schema.tables WHERE table_name LIKE 'upload_%'",
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("data_store.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_execute_binds_positionally() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER, value TEXT)", &[]).unwrap();
        let changed = db
            .execute(
                "INSERT INTO t (id, value) VALUES (?, ?)",
                &[ScalarValue::Integer(1), ScalarValue::Text("x'); --".to_string())],
            )
            .unwrap();
        assert_eq!(changed, 1);

        let rows = db.query("SELECT * FROM t WHERE id = ?", &[ScalarValue::Integer(1)]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(json!(rows[0]), json!({"id": 1, "value": "x'); --"}));
    }

    #[test]
    fn test_type_mismatch_is_engine_error() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER, value TEXT)", &[]).unwrap();

        let err = db
            .execute(
                "INSERT INTO t (id, value) VALUES (?, ?)",
                &[
                    ScalarValue::Text("not-a-number".to_string()),
                    ScalarValue::Text("x".to_string()),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Engine(_)));
        assert!(db.query("SELECT * FROM t", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_statements_refused() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();

        let err = db.query("SELECT 1; DROP TABLE t", &[]).unwrap_err();
        assert!(matches!(err, DatabaseError::MultipleStatements));
        let err = db.execute("INSERT INTO t VALUES (1); INSERT INTO t VALUES (2)", &[]).unwrap_err();
        assert!(matches!(err, DatabaseError::MultipleStatements));

        // the table is still there and untouched
        assert!(db.query("SELECT * FROM t", &[]).unwrap().is_empty());
        assert_eq!(db.query("SELECT 1 AS one;", &[]).unwrap()[0]["one"], json!(1));
    }

    #[test]
    fn test_rows_keep_engine_column_order() {
        let db = Database::open_in_memory().unwrap();
        let rows = db.query("SELECT 3 AS z, 2 AS a, 1 AS m", &[]).unwrap();
        let keys: Vec<_> = rows[0].keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_bulk_load_inserts_all_rows() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER, value TEXT)", &[]).unwrap();

        let loaded = db.bulk_load("t", &dataset(vec![1, 2, 3], vec!["a", "b", "c"])).unwrap();
        assert_eq!(loaded, 3);

        let rows = db.query("SELECT * FROM t ORDER BY id", &[]).unwrap();
        assert_eq!(
            json!(rows),
            json!([
                {"id": 1, "value": "a"},
                {"id": 2, "value": "b"},
                {"id": 3, "value": "c"}
            ])
        );
        assert!(leftover_relations(&db).is_empty());
    }

    #[test]
    fn test_bulk_load_spans_several_chunks() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER, value TEXT)", &[]).unwrap();

        let n = APPEND_CHUNK_ROWS * 2 + 7;
        let ids: Vec<i64> = (0..n as i64).collect();
        let values = vec!["v"; n];
        assert_eq!(db.bulk_load("t", &dataset(ids, values)).unwrap(), n);

        let rows = db.query("SELECT COUNT(*) AS n FROM t", &[]).unwrap();
        assert_eq!(rows[0]["n"], json!(n));
    }

    #[test]
    fn test_bulk_load_mismatch_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();

        let err = db.bulk_load("t", &dataset(vec![1], vec!["a"])).unwrap_err();
        assert!(matches!(err, DatabaseError::Engine(_)));

        let rows = db.query("SELECT COUNT(*) AS n FROM t", &[]).unwrap();
        assert_eq!(rows[0]["n"], json!(0));
        assert!(leftover_relations(&db).is_empty());
    }

    #[test]
    fn test_bulk_load_type_mismatch_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();

        let err = db.bulk_load("t", &text_dataset(vec!["007", "abc"])).unwrap_err();
        assert!(matches!(err, DatabaseError::Engine(_)));

        let rows = db.query("SELECT COUNT(*) AS n FROM t", &[]).unwrap();
        assert_eq!(rows[0]["n"], json!(0));
        assert!(leftover_relations(&db).is_empty());
    }

    #[test]
    fn test_bulk_load_converts_compatible_text() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();

        assert_eq!(db.bulk_load("t", &text_dataset(vec!["007", "8"])).unwrap(), 2);
        let rows = db.query("SELECT id FROM t ORDER BY id", &[]).unwrap();
        assert_eq!(json!(rows), json!([{"id": 7}, {"id": 8}]));
    }

    #[test]
    fn test_bulk_load_quotes_odd_column_names() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (a DOUBLE)", &[]).unwrap();

        let schema = Arc::new(Schema::new(vec![Field::new(
            "weird \"name\"",
            DataType::Float64,
            false,
        )]));
        let batch =
            RecordBatch::try_new(schema.clone(), vec![Arc::new(Float64Array::from(vec![0.5]))])
                .unwrap();

        assert_eq!(db.bulk_load("t", &Dataset::new(schema, vec![batch])).unwrap(), 1);
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let db = Database::open_in_memory().unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert!(db.is_closed());

        let err = db.query("SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, DatabaseError::Closed));
    }
}
