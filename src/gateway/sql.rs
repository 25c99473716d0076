//! SQL text construction.
//!
//! Builders only splice identifiers that already passed the identifier
//! grammar. Values are always left as `?` placeholders.

use crate::database::skip_leading_trivia;

/// `CREATE TABLE IF NOT EXISTS <table> (<columns>)`
pub fn create_table(table: &str, columns: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} ({columns})")
}

/// `INSERT INTO <table> (<c1>, <c2>) VALUES (?, ?)`
pub fn insert_row(table: &str, columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

/// `SELECT * FROM <table>`
pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM {table}")
}

/// Whether a raw statement hits the denylist: a leading `DROP`, any case.
///
/// Whatever the engine itself skips before the first keyword (whitespace,
/// a byte order mark, empty `;` statements, comments) is skipped here too.
pub fn is_denied(sql: &str) -> bool {
    skip_leading_trivia(sql)
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("DROP"))
}
