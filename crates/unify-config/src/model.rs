use serde::Deserialize;

/// A named identifier kind (e.g. "email"), spec §3.1.
#[derive(Debug, Clone, Deserialize)]
pub struct Key {
    pub name: String,
    #[serde(default)]
    pub invalid_texts: Vec<Option<String>>,
    #[serde(default)]
    pub valid_regexp: Option<String>,
}

/// Binds a source column to a declared `Key`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyColumn {
    pub column: String,
    pub key: String,
}

fn default_time_column() -> String {
    "time".to_string()
}

/// A source table contributing identifiers to the unification graph.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceTable {
    #[serde(default)]
    pub database: Option<String>,
    pub table: String,
    pub key_columns: Vec<KeyColumn>,
    #[serde(default = "default_time_column")]
    pub time_column: String,
}

impl SourceTable {
    /// The last dotted path segment of `table`, used as the suffix for
    /// generated table names (`enriched_<table>`, stats buckets, …).
    /// `database.schema.table` in the config collapses to `table` here;
    /// the fully-qualified form is still used for the `FROM` reference.
    pub fn short_name(&self) -> &str {
        self.table.rsplit('.').next().unwrap_or(&self.table)
    }
}

/// Orders the keys participating in unification; position defines the
/// namespace number (`ns = index + 1`).
#[derive(Debug, Clone, Deserialize)]
pub struct CanonicalId {
    #[serde(default = "default_canonical_id_name")]
    pub name: String,
    #[serde(default)]
    pub merge_by_keys: Vec<String>,
    #[serde(default)]
    pub merge_iterations: Option<u32>,
    #[serde(default)]
    pub key_priorities: Option<Vec<u32>>,
}

fn default_canonical_id_name() -> String {
    "unified_id".to_string()
}

impl Default for CanonicalId {
    fn default() -> Self {
        CanonicalId {
            name: default_canonical_id_name(),
            merge_by_keys: Vec::new(),
            merge_iterations: None,
            key_priorities: None,
        }
    }
}

/// One contributing source column for a `MasterAttribute`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceColumnRef {
    pub table: String,
    pub column: String,
    /// Defaults to the column's 1-based position within `source_columns`
    /// when omitted (recovered from `original_source`'s
    /// `enumerate(source_columns, 1)` fallback).
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub order_by: Option<String>,
}

/// A single materialized master-table column, with per-source priority
/// ordering and optional top-N array packing.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterAttribute {
    pub name: String,
    pub source_columns: Vec<SourceColumnRef>,
    #[serde(default)]
    pub array_elements: Option<u32>,
}

/// A per-canonical-ID single-row attribute rollup table.
#[derive(Debug, Clone, Deserialize)]
pub struct MasterTable {
    pub name: String,
    pub canonical_id: String,
    pub attributes: Vec<MasterAttribute>,
}

/// The raw, as-parsed declarative unification config (spec §6.1).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub keys: Vec<Key>,
    pub tables: Vec<SourceTable>,
    #[serde(default)]
    pub canonical_ids: Vec<CanonicalId>,
    #[serde(default)]
    pub master_tables: Vec<MasterTable>,
}
