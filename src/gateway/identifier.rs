//! Identifier grammar for table and column names.
//!
//! Identifiers cannot travel as bind parameters, so every name spliced into
//! SQL text must pass [`is_valid_identifier`] first.

use std::sync::OnceLock;

use regex::Regex;

use super::errors::{GatewayError, GatewayResult};

/// Reserved words that cannot appear unquoted as a table or column name.
const RESERVED_KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "AUTOINCREMENT", "BETWEEN", "CASE", "CHECK", "COLLATE",
    "COMMIT", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "DEFAULT", "DEFERRABLE", "DELETE", "DISTINCT", "DROP", "ELSE", "ESCAPE",
    "EXCEPT", "EXISTS", "FOREIGN", "FROM", "FULL", "GROUP", "HAVING", "IN", "INDEX", "INNER",
    "INSERT", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "LEFT", "LIMIT", "NATURAL", "NOT",
    "NOTNULL", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RETURNING",
    "RIGHT", "ROLLBACK", "SELECT", "SET", "TABLE", "THEN", "TO", "TRANSACTION", "TRUNCATE",
    "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

fn grammar() -> &'static Regex {
    static GRAMMAR: OnceLock<Regex> = OnceLock::new();
    GRAMMAR.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// Whether `name` is a legal, unreserved identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    grammar().is_match(name)
        && !RESERVED_KEYWORDS
            .iter()
            .any(|kw| kw.eq_ignore_ascii_case(name))
}

/// Fail with [`GatewayError::InvalidIdentifier`] unless `name` is valid.
pub fn validate_identifier(name: &str) -> GatewayResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(GatewayError::InvalidIdentifier(name.to_string()))
    }
}
