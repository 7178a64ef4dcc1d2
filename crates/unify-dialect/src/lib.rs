//! Dialect operator algebra (spec C2).
//!
//! `unify-plan` stage templates are written entirely against [`DialectOps`];
//! this crate supplies the two concrete backends named in the original
//! scripts (Snowflake, Databricks) plus the lookup used by the CLI's
//! `--dialect` flag.

pub mod databricks;
pub mod error;
pub mod ops;
pub mod snowflake;

pub use databricks::DatabricksDialect;
pub use error::RenderError;
pub use ops::DialectOps;
pub use snowflake::SnowflakeDialect;

/// Resolves a `--dialect` CLI value into a boxed [`DialectOps`].
pub fn resolve(name: &str) -> Result<Box<dyn DialectOps>, RenderError> {
    match name.to_ascii_lowercase().as_str() {
        "snowflake" => Ok(Box::new(SnowflakeDialect)),
        "databricks" => Ok(Box::new(DatabricksDialect)),
        other => Err(RenderError::UnknownDialect(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_dialects() {
        assert_eq!(resolve("snowflake").unwrap().name(), "snowflake");
        assert_eq!(resolve("Databricks").unwrap().name(), "databricks");
    }

    #[test]
    fn rejects_unknown_dialect() {
        assert!(matches!(resolve("redshift"), Err(RenderError::UnknownDialect(_))));
    }

    #[test]
    fn snowflake_rewrites_generic_cast() {
        let d = SnowflakeDialect;
        assert_eq!(d.rewrite("CAST(x AS LONG)"), "CAST(x AS NUMBER)");
    }

    #[test]
    fn databricks_rewrites_generic_cast() {
        let d = DatabricksDialect;
        assert_eq!(d.rewrite("CAST(x AS STRING)"), "CAST(x AS STRING)");
        assert_eq!(d.rewrite("CAST(x AS LONG)"), "CAST(x AS BIGINT)");
    }

    #[test]
    fn pair_literal_and_field_round_trip_shape() {
        let d = SnowflakeDialect;
        let pair = d.pair_literal("'a@x'", "1");
        assert!(pair.contains("OBJECT_CONSTRUCT"));
        let id = d.pair_field("p", "id", "VARCHAR");
        assert_eq!(id, "p:id::VARCHAR");
    }
}
