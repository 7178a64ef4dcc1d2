use thiserror::Error;

/// Fatal, compile-time errors raised while loading or validating a
/// unification config (spec §7 `ConfigError`).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("key column '{column}' on table '{table}' references undeclared key '{key}'")]
    UnknownKey {
        table: String,
        column: String,
        key: String,
    },

    #[error("master attribute '{attribute}' on master table '{master}' references undeclared source table '{table}'")]
    UnknownSourceTable {
        master: String,
        attribute: String,
        table: String,
    },

    #[error("canonical_ids[0].merge_by_keys references undeclared key '{0}'")]
    UnknownMergeKey(String),

    #[error("canonical_ids[0].key_priorities has {actual} entries, expected {expected} (one per merge key)")]
    PriorityArityMismatch { expected: usize, actual: usize },

    #[error("master table '{0}' declares no attributes")]
    EmptyMasterTable(String),
}
