//! Lexical scanning of raw SQL text.
//!
//! Just enough of the engine's lexer to find where the first statement
//! starts and ends: quoted strings and identifiers, `--` line comments,
//! nestable `/* */` block comments and `$$` bodies are opaque.

/// Skip whitespace, byte order marks, empty statements (`;`) and comments
/// at the start of `sql`.
///
/// An unterminated comment swallows the rest of the text.
pub fn skip_leading_trivia(sql: &str) -> &str {
    let mut rest = sql;
    loop {
        let trimmed =
            rest.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}' || c == ';');

        if let Some(comment) = trimmed.strip_prefix("--") {
            rest = comment.find('\n').map_or("", |at| &comment[at + 1..]);
        } else if let Some(comment) = trimmed.strip_prefix("/*") {
            rest = skip_block_comment(comment);
        } else {
            return trimmed;
        }
    }
}

/// True when anything other than trivia follows the first statement.
pub fn has_trailing_statement(sql: &str) -> bool {
    let body = skip_leading_trivia(sql);
    match statement_end(body) {
        Some(end) => !skip_leading_trivia(&body[end..]).is_empty(),
        None => false,
    }
}

/// Byte offset of the first `;` outside quotes and comments.
fn statement_end(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        i = match bytes[i] {
            b';' => return Some(i),
            // a doubled quote closes and immediately reopens, which lands in the same place
            quote @ (b'\'' | b'"') => bytes[i + 1..]
                .iter()
                .position(|&b| b == quote)
                .map_or(bytes.len(), |at| i + 1 + at + 1),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                sql[i..].find('\n').map_or(bytes.len(), |at| i + at + 1)
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                bytes.len() - skip_block_comment(&sql[i + 2..]).len()
            }
            b'$' if bytes.get(i + 1) == Some(&b'$') => {
                sql[i + 2..].find("$$").map_or(bytes.len(), |at| i + 2 + at + 2)
            }
            _ => i + 1,
        };
    }
    None
}

/// `body` starts just after an opening `/*`. Returns the text after the
/// matching `*/`, honoring nesting.
fn skip_block_comment(body: &str) -> &str {
    let bytes = body.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;

    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return &body[i..];
                }
            }
            _ => i += 1,
        }
    }
    ""
}
