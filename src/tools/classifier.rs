//! SQL statement classification.
//!
//! Classification is prefix-based only: the trimmed, upper-cased text is matched
//! against fixed keyword sets. No parsing or syntax validation happens here, so
//! text starting with a comment, a `WITH` clause or anything else unrecognized
//! is reported as [`StatementKind::Unknown`].
//!
//! [`is_batch`] is the one lexical check beyond the leading keyword: it finds a
//! `;` separating two statements, outside quotes and comments.

use crate::models::StatementKind;

/// Leading keywords of read-only statements.
pub const READ_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC"];

/// Leading keywords of data-modifying statements.
pub const WRITE_KEYWORDS: &[&str] = &["INSERT", "UPDATE", "DELETE"];

/// Leading keywords of schema-modifying statements.
pub const DDL_KEYWORDS: &[&str] = &["CREATE", "DROP", "ALTER", "TRUNCATE"];

/// Classify SQL text by its leading keyword.
///
/// # Examples
///
/// ```
/// use mysql_mcp_gateway::models::StatementKind;
/// use mysql_mcp_gateway::tools::classifier::classify;
///
/// assert_eq!(classify("  select * from users"), StatementKind::Read);
/// assert_eq!(classify("DROP TABLE users"), StatementKind::Ddl);
/// assert_eq!(classify("WITH t AS (SELECT 1) SELECT * FROM t"), StatementKind::Unknown);
/// ```
pub fn classify(sql: &str) -> StatementKind {
    let normalized = sql.trim().to_uppercase();
    let starts_with_any = |keywords: &[&str]| keywords.iter().any(|k| normalized.starts_with(k));

    if starts_with_any(READ_KEYWORDS) {
        StatementKind::Read
    } else if starts_with_any(WRITE_KEYWORDS) {
        StatementKind::Write
    } else if starts_with_any(DDL_KEYWORDS) {
        StatementKind::Ddl
    } else {
        StatementKind::Unknown
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Whether the text holds more than one statement.
///
/// A trailing `;` followed only by whitespace or comments is a single
/// statement. Quoted strings and identifiers (`'..'`, `".."`, `` `..` ``) and
/// comments (`-- `, `#`, `/* */`) are skipped. The bodies of `/*! */` and
/// `/*+ */` comments are executed by MySQL, so they are scanned as code.
///
/// # Examples
///
/// ```
/// use mysql_mcp_gateway::tools::classifier::is_batch;
///
/// assert!(is_batch("SELECT 1; DROP TABLE users"));
/// assert!(!is_batch("SELECT ';' FROM dual;"));
/// ```
pub fn is_batch(sql: &str) -> bool {
    let mut state = Lexeme::Code;
    let mut terminated = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Lexeme::Quoted(quote) => {
                if c == '\\' {
                    chars.next();
                } else if c == quote {
                    // A doubled quote stays inside the literal.
                    if chars.peek() == Some(&quote) {
                        chars.next();
                    } else {
                        state = Lexeme::Code;
                    }
                }
            }
            Lexeme::LineComment => {
                if c == '\n' {
                    state = Lexeme::Code;
                }
            }
            Lexeme::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = Lexeme::Code;
                }
            }
            Lexeme::Code => match c {
                '#' => state = Lexeme::LineComment,
                '-' if chars.peek() == Some(&'-') => {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        None => state = Lexeme::LineComment,
                        Some(next) if next.is_whitespace() => state = Lexeme::LineComment,
                        Some(_) if terminated => return true,
                        Some(_) => {}
                    }
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    match chars.peek() {
                        Some('!') | Some('+') => {
                            if terminated {
                                return true;
                            }
                        }
                        _ => state = Lexeme::BlockComment,
                    }
                }
                '*' if chars.peek() == Some(&'/') => {
                    // End of an executable comment.
                    chars.next();
                }
                ';' => terminated = true,
                c if c.is_whitespace() => {}
                c => {
                    if terminated {
                        return true;
                    }
                    if matches!(c, '\'' | '"' | '`') {
                        state = Lexeme::Quoted(c);
                    }
                }
            },
        }
    }

    false
}
