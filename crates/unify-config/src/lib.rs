//! Declarative identity-unification config model: parse, validate, compile.
//!
//! This is spec component C1. `Config` is the as-parsed YAML document;
//! [`Config::compile`] is the only path the rest of the workspace accepts
//! input through — it validates referential invariants (spec §3.1) and
//! resolves the defaults and ordinal/namespace assignments that the plan
//! compiler (`unify-plan`) requires.

pub mod compiled;
pub mod error;
pub mod model;

use std::collections::HashSet;

pub use compiled::{
    CompiledCanonicalId, CompiledConfig, CompiledMasterAttribute, CompiledMasterTable,
    CompiledSourceColumnRef, CompiledSourceTable,
};
pub use error::ConfigError;
use indexmap::IndexMap;
pub use model::{
    CanonicalId, Config, Key, KeyColumn, MasterAttribute, MasterTable, SourceColumnRef, SourceTable,
};

impl Config {
    /// Parses a YAML document into a raw [`Config`] (spec §4.1 `parse`).
    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// The effective `canonical_ids[0]`, applying the documented default
    /// (`name="unified_id"`, `merge_by_keys=[]`) when the list is empty
    /// (spec §4.1).
    fn effective_canonical_id(&self) -> CanonicalId {
        self.canonical_ids.first().cloned().unwrap_or_default()
    }

    /// Checks the referential invariants of spec §3.1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key_names: HashSet<&str> = self.keys.iter().map(|k| k.name.as_str()).collect();
        let table_names: HashSet<&str> = self.tables.iter().map(|t| t.table.as_str()).collect();

        for table in &self.tables {
            for kc in &table.key_columns {
                if !key_names.contains(kc.key.as_str()) {
                    return Err(ConfigError::UnknownKey {
                        table: table.table.clone(),
                        column: kc.column.clone(),
                        key: kc.key.clone(),
                    });
                }
            }
        }

        let canonical_id = self.effective_canonical_id();
        for key in &canonical_id.merge_by_keys {
            if !key_names.contains(key.as_str()) {
                return Err(ConfigError::UnknownMergeKey(key.clone()));
            }
        }
        if let Some(priorities) = &canonical_id.key_priorities {
            if priorities.len() != canonical_id.merge_by_keys.len() {
                return Err(ConfigError::PriorityArityMismatch {
                    expected: canonical_id.merge_by_keys.len(),
                    actual: priorities.len(),
                });
            }
        }

        for master in &self.master_tables {
            if master.attributes.is_empty() {
                return Err(ConfigError::EmptyMasterTable(master.name.clone()));
            }
            for attr in &master.attributes {
                for sc in &attr.source_columns {
                    if !table_names.contains(sc.table.as_str()) {
                        return Err(ConfigError::UnknownSourceTable {
                            master: master.name.clone(),
                            attribute: attr.name.clone(),
                            table: sc.table.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Validates and resolves this config into a [`CompiledConfig`]: assigns
    /// 1-based `table_id`s in declaration order, resolves namespace numbers
    /// from `merge_by_keys` position, and fills every optional field the
    /// plan compiler needs concretely (spec §3.1, SPEC_FULL §5.1).
    pub fn compile(&self) -> Result<CompiledConfig, ConfigError> {
        self.validate()?;

        let tables = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| CompiledSourceTable {
                table_id: i as u32 + 1,
                inner: t.clone(),
            })
            .collect();

        let canonical_id_raw = self.effective_canonical_id();
        let canonical_id = compiled::compile_canonical_id(&canonical_id_raw);

        let merge_key_ns: IndexMap<String, u32> = canonical_id
            .merge_by_keys
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as u32 + 1))
            .collect();

        let master_tables = self
            .master_tables
            .iter()
            .map(compiled::compile_master_table)
            .collect();

        Ok(CompiledConfig {
            keys: self.keys.clone(),
            tables,
            canonical_id,
            master_tables,
            merge_key_ns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_KEY_YAML: &str = r#"
keys:
  - name: email
    invalid_texts: ["", null]
  - name: phone
tables:
  - table: events
    key_columns:
      - { column: email_col, key: email }
      - { column: phone_col, key: phone }
canonical_ids:
  - name: unified_id
    merge_by_keys: [email, phone]
"#;

    #[test]
    fn parses_and_compiles_two_key_config() {
        let config = Config::parse(TWO_KEY_YAML).unwrap();
        let compiled = config.compile().unwrap();
        assert_eq!(compiled.tables[0].table_id, 1);
        assert_eq!(compiled.ns_of("email"), Some(1));
        assert_eq!(compiled.ns_of("phone"), Some(2));
        assert_eq!(compiled.canonical_id.key_priorities, vec![1, 2]);
    }

    #[test]
    fn defaults_canonical_id_when_absent() {
        let config = Config::parse(
            r#"
keys:
  - name: email
tables:
  - table: events
    key_columns:
      - { column: email_col, key: email }
"#,
        )
        .unwrap();
        let compiled = config.compile().unwrap();
        assert_eq!(compiled.canonical_id.name, "unified_id");
        assert!(compiled.canonical_id.merge_by_keys.is_empty());
    }

    #[test]
    fn rejects_unknown_key_reference() {
        let config = Config::parse(
            r#"
keys:
  - name: email
tables:
  - table: events
    key_columns:
      - { column: phone_col, key: phone }
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownKey { .. })
        ));
    }

    #[test]
    fn rejects_priority_arity_mismatch() {
        let config = Config::parse(
            r#"
keys:
  - name: email
  - name: phone
tables:
  - table: events
    key_columns:
      - { column: email_col, key: email }
canonical_ids:
  - merge_by_keys: [email, phone]
    key_priorities: [1]
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PriorityArityMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn rejects_unknown_source_table_in_master_attribute() {
        let config = Config::parse(
            r#"
keys:
  - name: email
tables:
  - table: events
    key_columns:
      - { column: email_col, key: email }
canonical_ids:
  - merge_by_keys: [email]
master_tables:
  - name: customers
    canonical_id: unified_id
    attributes:
      - name: best_email
        source_columns:
          - { table: missing_table, column: email_col }
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownSourceTable { .. })
        ));
    }

    #[test]
    fn source_column_priority_defaults_to_position() {
        let config = Config::parse(
            r#"
keys:
  - name: email
tables:
  - table: t1
    key_columns: []
  - table: t2
    key_columns: []
canonical_ids:
  - merge_by_keys: [email]
master_tables:
  - name: customers
    canonical_id: unified_id
    attributes:
      - name: best_email
        source_columns:
          - { table: t1, column: e1 }
          - { table: t2, column: e2, priority: 5 }
"#,
        )
        .unwrap();
        let compiled = config.compile().unwrap();
        let attr = &compiled.master_tables[0].attributes[0];
        assert_eq!(attr.source_columns[0].priority, 1);
        assert_eq!(attr.source_columns[0].order_by, "time");
        assert_eq!(attr.source_columns[1].priority, 5);
    }
}
