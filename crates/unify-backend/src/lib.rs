//! Backend adapter (spec C5): a single synchronous capability, no intrinsic
//! concurrency (spec §5) — `execute`/`fetch_scalar_i64` round-trips on one
//! logical session.

pub mod error;
pub mod mock;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::{BackendError, ConnectError};
pub use mock::MockBackend;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;

/// Outcome of a successful [`Backend::execute`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub rows_affected: Option<u64>,
}

/// Single synchronous capability over a warehouse session (spec §4.5).
pub trait Backend {
    /// Executes `stmt`, which may contain multiple `;`-separated
    /// statements. `USE ...` and `SET ...` statements are idempotent
    /// context-setters (spec §4.5), grounded in
    /// `snowflake_sql_executor.py::execute_sql`'s statement-type dispatch.
    fn execute(&mut self, stmt: &str) -> Result<ExecuteOutcome, BackendError>;

    /// Executes a single-row, single-column query and returns it as `i64`
    /// — used for the convergence count (spec §4.4 step 4).
    fn fetch_scalar_i64(&mut self, stmt: &str) -> Result<i64, BackendError>;

    fn close(&mut self);
}

/// Splits `sql` on `;` boundaries, dropping blank statements, preserving
/// the original Python's `[stmt.strip() for stmt in sql.split(";") if
/// stmt.strip()]` semantics (spec §4.5, `snowflake_sql_executor.py`).
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// True for statements whose execution is idempotent context-setting
/// rather than data-mutating (`USE ...` / `SET ...`), per spec §4.5.
pub fn is_context_statement(stmt: &str) -> bool {
    let upper = stmt.trim_start().to_ascii_uppercase();
    upper.starts_with("USE DATABASE")
        || upper.starts_with("USE SCHEMA")
        || upper.starts_with("USE WAREHOUSE")
        || upper.starts_with("SET ")
}

/// Classifies a dialect-specific error string into the spec §7 taxonomy,
/// grounded in `snowflake_sql_executor.py::execute_sql`'s substring
/// dispatch (`"does not exist"`, `"WAREHOUSE"`, …) and
/// `databricks_sql_executor.py`'s equivalent.
pub fn classify_message(message: &str) -> BackendError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("does not exist") || lower.contains("not found") {
        BackendError::NotFound(message.to_string())
    } else if lower.contains("permission") || lower.contains("access denied") || lower.contains("not authorized") {
        BackendError::Permission(message.to_string())
    } else if lower.contains("syntax error") || lower.contains("parse error") {
        BackendError::Syntax(message.to_string())
    } else if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection reset")
        || lower.contains("try again")
    {
        BackendError::Transient(message.to_string())
    } else {
        BackendError::Other(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_statements_drops_blanks() {
        let stmts = split_statements("SELECT 1; ; SELECT 2;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn context_statements_recognized() {
        assert!(is_context_statement("USE DATABASE foo"));
        assert!(is_context_statement("  set search_path = foo"));
        assert!(!is_context_statement("SELECT 1"));
    }

    #[test]
    fn classify_table_not_found() {
        assert!(matches!(
            classify_message("Table 'foo' does not exist"),
            BackendError::NotFound(_)
        ));
    }

    #[test]
    fn classify_permission() {
        assert!(matches!(
            classify_message("Permission denied on object"),
            BackendError::Permission(_)
        ));
    }

    #[test]
    fn classify_falls_back_to_other() {
        assert!(matches!(classify_message("something weird"), BackendError::Other(_)));
    }
}
