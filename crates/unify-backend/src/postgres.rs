//! Postgres-wire [`Backend`] (feature `postgres`).
//!
//! Stands in for "the external warehouse client" spec §1 places out of
//! scope: the spec only prescribes the operator algebra (`unify-dialect`)
//! and the statement contract (`Backend`), not a specific warehouse wire
//! protocol, so a Postgres-speaking backend is a legitimate collaborator.
//! Grounded in the pack's `tokio_postgres` idiom (spawned connection task,
//! `.map_err` into a typed error, `batch_execute` for compound statement
//! blocks).

use tokio::runtime::Runtime;
use tokio_postgres::{Client, NoTls};

use crate::error::{BackendError, ConnectError};
use crate::{classify_message, split_statements, Backend, ExecuteOutcome};

/// A Postgres session plus the single-threaded runtime used to drive it,
/// so [`Backend`]'s synchronous contract (spec §4.5, §5 "single logical
/// connection") holds from the caller's perspective even though the wire
/// client is async.
pub struct PostgresBackend {
    client: Client,
    runtime: Runtime,
}

impl PostgresBackend {
    /// Connects using a Postgres connection string (spec §4.5 `connect`).
    /// Credentials resolution (`UNIFY_BACKEND_DSN` env var vs. `--dsn`) is
    /// the CLI's responsibility; this only accepts an already-resolved DSN.
    ///
    /// Rejects a DSN missing both `user=` and `password=` keywords before
    /// attempting to connect, rather than letting the wire client fail with
    /// an opaque authentication error partway through the handshake.
    pub fn connect(dsn: &str) -> Result<Self, ConnectError> {
        let missing: Vec<&str> = [("user=", "user"), ("password=", "password")]
            .into_iter()
            .filter(|(kw, _)| !dsn.contains(kw))
            .map(|(_, name)| name)
            .collect();
        if !missing.is_empty() {
            return Err(ConnectError::MissingCredentials(missing.join(", ")));
        }

        let runtime = Runtime::new().map_err(|e| ConnectError::Failed(e.to_string()))?;
        let client = runtime.block_on(async {
            let (client, connection) = tokio_postgres::connect(dsn, NoTls)
                .await
                .map_err(|e| ConnectError::Failed(e.to_string()))?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    log::error!("postgres connection task error: {e}");
                }
            });
            Ok::<_, ConnectError>(client)
        })?;
        Ok(PostgresBackend { client, runtime })
    }
}

impl Backend for PostgresBackend {
    fn execute(&mut self, stmt: &str) -> Result<ExecuteOutcome, BackendError> {
        let statements = split_statements(stmt);
        let client = &self.client;
        self.runtime.block_on(async move {
            let mut rows_affected = 0u64;
            let mut any_count = false;
            for part in statements {
                match client.execute(part, &[]).await {
                    Ok(n) => {
                        rows_affected += n;
                        any_count = true;
                    }
                    Err(e) => return Err(classify_message(&e.to_string())),
                }
            }
            Ok(ExecuteOutcome {
                rows_affected: any_count.then_some(rows_affected),
            })
        })
    }

    fn fetch_scalar_i64(&mut self, stmt: &str) -> Result<i64, BackendError> {
        let client = &self.client;
        self.runtime.block_on(async move {
            let row = client
                .query_one(stmt, &[])
                .await
                .map_err(|e| classify_message(&e.to_string()))?;
            Ok(row.get::<usize, i64>(0))
        })
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dsn_missing_both_credentials() {
        let err = PostgresBackend::connect("host=localhost dbname=unify").unwrap_err();
        match err {
            ConnectError::MissingCredentials(fields) => {
                assert!(fields.contains("user"));
                assert!(fields.contains("password"));
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn rejects_dsn_missing_password_only() {
        let err = PostgresBackend::connect("host=localhost user=alice dbname=unify").unwrap_err();
        match err {
            ConnectError::MissingCredentials(fields) => assert_eq!(fields, "password"),
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
    }
}
