//! Plan compiler (spec C3): compiles a [`CompiledConfig`] into an ordered
//! [`Plan`] of named SQL stages (spec §4.3), plus the canonical-ID hash
//! construction (§4.3.4) and the validation predicate (§4.3.1) shared with
//! the loop driver and mock backend.

pub mod canonical_id;
pub mod naming;
pub mod stage;
pub mod templates;
pub mod validate;

use std::sync::Arc;

use unify_config::CompiledConfig;
use unify_dialect::DialectOps;

pub use stage::{LoopTemplate, Plan, Stage};

/// Iteration count `N` (spec §4.3.2): `merge_iterations` if configured,
/// otherwise `clamp(2 + |merge_keys| + floor(|tables|/2), 2, 10)`.
pub fn iteration_count(config: &CompiledConfig) -> u32 {
    if let Some(n) = config.canonical_id.merge_iterations {
        return n;
    }
    let base = 2 + config.canonical_id.merge_by_keys.len() as u32 + (config.tables.len() as u32) / 2;
    base.clamp(2, 10)
}

/// Compiles `config` into a [`Plan`] for `dialect`, writing to
/// `<target_catalog>.<target_schema>` and reading sources from
/// `<src_catalog>.<src_schema>` (falling back to the target when a
/// `SourceTable` doesn't override `database`).
pub fn compile(
    config: &CompiledConfig,
    dialect: Arc<dyn DialectOps>,
    target_catalog: &str,
    target_schema: &str,
    src_catalog: &str,
    src_schema: &str,
) -> Plan {
    let prefix = &config.canonical_id.name;
    let mut stages = Vec::new();

    stages.push(templates::create_graph::render(dialect.as_ref(), prefix));
    stages.push(templates::extract_merge::render(dialect.as_ref(), config, prefix, src_catalog, src_schema));
    stages.push(templates::source_key_stats::render(dialect.as_ref(), config, prefix));

    let loop_template = LoopTemplate {
        dialect: Arc::clone(&dialect),
        target: format!("{target_catalog}.{target_schema}"),
        priorities: config.canonical_id.key_priorities.clone(),
    };
    let n = iteration_count(config);
    for k in 1..=n {
        stages.push(loop_template.render(prefix, k));
    }

    stages.push(templates::canonicalize::render(dialect.as_ref(), config, prefix));
    stages.push(templates::result_key_stats::render(dialect.as_ref(), config, prefix));

    for table in &config.tables {
        stages.push(templates::enrich::render(dialect.as_ref(), config, table, prefix, src_catalog, src_schema));
    }

    for master in &config.master_tables {
        stages.push(templates::master_table::render(dialect.as_ref(), config, master, prefix));
    }

    stages.push(templates::metadata::render_unification_metadata(dialect.as_ref(), config));
    stages.push(templates::metadata::render_filter_lookup(dialect.as_ref(), config));
    stages.push(templates::metadata::render_column_lookup(dialect.as_ref(), config));

    Plan {
        stages,
        loop_template,
        compiled_iterations: n,
        canonical_id_name: config.canonical_id.name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unify_config::Config;
    use unify_dialect::SnowflakeDialect;

    fn two_key_config() -> CompiledConfig {
        Config::parse(
            r#"
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
  - merge_by_keys: [email, phone]
"#,
        )
        .unwrap()
        .compile()
        .unwrap()
    }

    #[test]
    fn iteration_count_uses_heuristic_when_unset() {
        let config = two_key_config();
        // base 2 + 2 merge keys + floor(1 table / 2) = 4
        assert_eq!(iteration_count(&config), 4);
    }

    #[test]
    fn iteration_count_honors_override() {
        let mut config = two_key_config();
        config.canonical_id.merge_iterations = Some(7);
        assert_eq!(iteration_count(&config), 7);
    }

    #[test]
    fn iteration_count_clamps_to_ten() {
        let config = Config::parse(
            r#"
keys: [{name: k1}, {name: k2}, {name: k3}, {name: k4}, {name: k5}, {name: k6}, {name: k7}, {name: k8}]
tables:
  - table: t1
    key_columns: []
canonical_ids:
  - merge_by_keys: [k1, k2, k3, k4, k5, k6, k7, k8]
"#,
        )
        .unwrap()
        .compile()
        .unwrap();
        assert_eq!(iteration_count(&config), 10);
    }

    #[test]
    fn compile_emits_stages_in_spec_order() {
        let config = two_key_config();
        let dialect: Arc<dyn unify_dialect::DialectOps> = Arc::new(SnowflakeDialect);
        let plan = compile(&config, dialect, "cat", "schema", "cat", "schema");
        let ordered = plan.ordered_stages();
        let stems: Vec<&str> = ordered.iter().map(|s| s.file_stem.as_str()).collect();

        assert_eq!(stems[0], "01_create_graph");
        assert_eq!(stems[1], "02_extract_merge");
        assert_eq!(stems[2], "03_source_key_stats");
        assert!(stems[3].starts_with("04_unify_loop_iteration_"));
        let last_loop_idx = stems.iter().rposition(|s| s.starts_with("04_unify_loop_iteration_")).unwrap();
        assert_eq!(stems[last_loop_idx + 1], "05_canonicalize");
        assert_eq!(stems[last_loop_idx + 2], "06_result_key_stats");
        assert!(stems.contains(&"10_enrich_events"));
        assert_eq!(stems[stems.len() - 3], "30_unification_metadata");
        assert_eq!(stems[stems.len() - 2], "31_filter_lookup");
        assert_eq!(stems[stems.len() - 1], "32_column_lookup");
    }

    #[test]
    fn compile_emits_one_enrich_stage_per_table() {
        let config = Config::parse(
            r#"
keys:
  - name: email
tables:
  - table: a
    key_columns: [{column: e, key: email}]
  - table: b
    key_columns: [{column: e, key: email}]
canonical_ids:
  - merge_by_keys: [email]
"#,
        )
        .unwrap()
        .compile()
        .unwrap();
        let dialect: Arc<dyn unify_dialect::DialectOps> = Arc::new(SnowflakeDialect);
        let plan = compile(&config, dialect, "cat", "schema", "cat", "schema");
        let stems: Vec<&str> = plan.stages.iter().map(|s| s.file_stem.as_str()).collect();
        assert!(stems.contains(&"10_enrich_a"));
        assert!(stems.contains(&"10_enrich_b"));
    }
}
