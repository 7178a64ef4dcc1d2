//! In-memory [`Backend`] used by the CLI's `--mock` flag and by
//! `unify-loop`'s driver tests. `--dry-run` never reaches a `Backend` at
//! all — it prints the plan and returns before backend resolution.
//!
//! Parsing and evaluating the full operator algebra `unify-plan` emits
//! (array construction, `SHA2`, `LATERAL FLATTEN`, …) would mean
//! reimplementing a SQL engine — out of scope per spec §1's "Non-goals"
//! (warehouse connection/execution semantics are an external collaborator).
//! Instead `MockBackend` tracks table existence well enough to drive
//! `CREATE [OR REPLACE] TABLE` / `DROP TABLE IF EXISTS` / `ALTER TABLE ...
//! RENAME TO ...` bookkeeping, and lets a test script the scalar answers
//! `fetch_scalar_i64` returns — which is all the loop driver's control flow
//! (iteration counting, convergence detection, alias finalization, error
//! policy) actually depends on. The graph-closure algebra itself (leader
//! promotion, monotonicity, convergence) is exercised directly against the
//! pure-Rust reference model in `unify_loop::sim`, not through this mock.

use std::collections::{HashSet, VecDeque};

use regex::Regex;

use crate::error::BackendError;
use crate::{is_context_statement, split_statements, ExecuteOutcome};

/// In-memory stand-in for a warehouse session.
#[derive(Debug, Default)]
pub struct MockBackend {
    tables: HashSet<String>,
    /// Canned answers for `fetch_scalar_i64`, consumed in order; once
    /// exhausted, further calls return `0` (converged) rather than erroring,
    /// so tests only need to script the iterations they care about.
    scripted_scalars: VecDeque<i64>,
    pub executed: Vec<String>,
    fail_on: Option<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next `n` `fetch_scalar_i64` responses, in order.
    pub fn script_scalars(&mut self, values: impl IntoIterator<Item = i64>) {
        self.scripted_scalars.extend(values);
    }

    /// Makes the next `execute` call containing `needle` fail with a
    /// `BackendError::Other`, once.
    pub fn fail_next_containing(&mut self, needle: impl Into<String>) {
        self.fail_on = Some(needle.into());
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    fn apply_ddl(&mut self, stmt: &str) {
        static CREATE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        static DROP: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        static RENAME: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();

        let create_re = CREATE.get_or_init(|| {
            Regex::new(r"(?is)CREATE\s+(?:OR\s+REPLACE\s+)?TABLE\s+([a-zA-Z0-9_.]+)").unwrap()
        });
        let drop_re = DROP.get_or_init(|| Regex::new(r"(?is)DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?([a-zA-Z0-9_.]+)").unwrap());
        let rename_re = RENAME
            .get_or_init(|| Regex::new(r"(?is)ALTER\s+TABLE\s+([a-zA-Z0-9_.]+)\s+RENAME\s+TO\s+([a-zA-Z0-9_.]+)").unwrap());

        if let Some(caps) = rename_re.captures(stmt) {
            self.tables.remove(&caps[1]);
            self.tables.insert(caps[2].to_string());
        } else if let Some(caps) = drop_re.captures(stmt) {
            self.tables.remove(&caps[1]);
        } else if let Some(caps) = create_re.captures(stmt) {
            self.tables.insert(caps[1].to_string());
        }
    }
}

impl crate::Backend for MockBackend {
    fn execute(&mut self, stmt: &str) -> Result<ExecuteOutcome, BackendError> {
        for part in split_statements(stmt) {
            if let Some(needle) = self.fail_on.clone() {
                if part.contains(&needle) {
                    self.fail_on = None;
                    return Err(BackendError::Other(format!("mock failure on: {part}")));
                }
            }
            self.executed.push(part.to_string());
            if !is_context_statement(part) {
                self.apply_ddl(part);
            }
        }
        Ok(ExecuteOutcome { rows_affected: None })
    }

    fn fetch_scalar_i64(&mut self, stmt: &str) -> Result<i64, BackendError> {
        self.executed.push(stmt.trim().to_string());
        Ok(self.scripted_scalars.pop_front().unwrap_or(0))
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;

    #[test]
    fn tracks_create_and_drop() {
        let mut backend = MockBackend::new();
        backend.execute("CREATE OR REPLACE TABLE foo.bar (x INT)").unwrap();
        assert!(backend.table_exists("foo.bar"));
        backend.execute("DROP TABLE IF EXISTS foo.bar").unwrap();
        assert!(!backend.table_exists("foo.bar"));
    }

    #[test]
    fn tracks_rename() {
        let mut backend = MockBackend::new();
        backend.execute("CREATE TABLE foo.bar_tmp (x INT)").unwrap();
        backend.execute("ALTER TABLE foo.bar_tmp RENAME TO foo.bar").unwrap();
        assert!(!backend.table_exists("foo.bar_tmp"));
        assert!(backend.table_exists("foo.bar"));
    }

    #[test]
    fn scripted_scalars_consumed_in_order() {
        let mut backend = MockBackend::new();
        backend.script_scalars([3, 1, 0]);
        assert_eq!(backend.fetch_scalar_i64("SELECT COUNT(*)").unwrap(), 3);
        assert_eq!(backend.fetch_scalar_i64("SELECT COUNT(*)").unwrap(), 1);
        assert_eq!(backend.fetch_scalar_i64("SELECT COUNT(*)").unwrap(), 0);
        assert_eq!(backend.fetch_scalar_i64("SELECT COUNT(*)").unwrap(), 0);
    }

    #[test]
    fn context_statements_do_not_affect_table_tracking() {
        let mut backend = MockBackend::new();
        backend.execute("USE DATABASE foo; USE SCHEMA bar;").unwrap();
        assert!(backend.executed.iter().any(|s| s.starts_with("USE DATABASE")));
    }

    #[test]
    fn scripted_failure_surfaces_once() {
        let mut backend = MockBackend::new();
        backend.fail_next_containing("BOOM");
        assert!(backend.execute("SELECT BOOM").is_err());
        assert!(backend.execute("SELECT BOOM").is_ok());
    }
}
