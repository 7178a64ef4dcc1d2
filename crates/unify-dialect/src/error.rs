use thiserror::Error;

/// Compile-time error raised by dialect resolution (spec §7 `RenderError`).
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown dialect '{0}', expected one of: snowflake, databricks")]
    UnknownDialect(String),
}
