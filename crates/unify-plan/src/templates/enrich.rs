use unify_config::{CompiledConfig, CompiledSourceTable};
use unify_dialect::DialectOps;

use crate::canonical_id::KEY_MASKS;
use crate::naming;
use crate::stage::Stage;
use crate::templates::canonicalize::canonical_id_expr;
use crate::validate::valid_predicate;

/// Stage `10_enrich_<table>` (spec §4.3.5): appends the canonical ID column
/// to a copy of each source table. For each row, the first key column (in
/// merge-key order) that validates is looked up in `canonical_id_lookup`;
/// on a miss, the canonical ID is computed directly via the §4.3.4
/// construction (the key's own mask); rows with no valid key column get
/// `NULL`.
pub fn render(
    dialect: &dyn DialectOps,
    config: &CompiledConfig,
    table: &CompiledSourceTable,
    prefix: &str,
    src_catalog: &str,
    src_schema: &str,
) -> Stage {
    let lookup = naming::lookup(prefix);
    let enriched = naming::enriched(table.short_name());
    let canonical_id_name = &config.canonical_id.name;

    let mut key_columns: Vec<_> = table
        .key_columns
        .iter()
        .filter_map(|kc| config.ns_of(&kc.key).map(|ns| (kc, ns)))
        .collect();
    key_columns.sort_by_key(|(_, ns)| *ns);

    let src_ref = match &table.database {
        Some(db) => naming::qualified(db, src_schema, table.short_name()),
        None => naming::qualified(src_catalog, src_schema, table.short_name()),
    };

    if key_columns.is_empty() {
        let sql = format!(
            "CREATE OR REPLACE TABLE {enriched} AS\nSELECT src.*, CAST(NULL AS STRING) AS {canonical_id_name}\nFROM {src_ref} src"
        );
        return Stage::new(format!("10_enrich_{}", table.short_name()), dialect.rewrite(&sql));
    }

    let id_arms: Vec<String> = key_columns
        .iter()
        .map(|(kc, _)| {
            let key = config.key(&kc.key).expect("validated by Config::validate");
            let predicate = valid_predicate(&kc.column, key);
            format!("WHEN {predicate} THEN CAST({} AS STRING)", kc.column)
        })
        .collect();
    let ns_arms: Vec<String> = key_columns
        .iter()
        .map(|(kc, ns)| {
            let key = config.key(&kc.key).expect("validated by Config::validate");
            let predicate = valid_predicate(&kc.column, key);
            format!("WHEN {predicate} THEN {ns}")
        })
        .collect();
    let candidate_id = format!("CASE {} ELSE NULL END", id_arms.join(" "));
    let candidate_ns = format!("CASE {} ELSE NULL END", ns_arms.join(" "));

    let mask_arms: Vec<String> = key_columns
        .iter()
        .map(|(_, ns)| format!("WHEN {ns} THEN '{}'", KEY_MASKS[(*ns as usize) - 1]))
        .collect();
    let mask_case = format!("CASE candidate.candidate_ns {} END", mask_arms.join(" "));
    let fallback_hash = canonical_id_expr(dialect, "candidate.candidate_id", &mask_case);

    let sql = format!(
        "CREATE OR REPLACE TABLE {enriched} AS\n\
         SELECT\n    \
             candidate.*,\n    \
             COALESCE(lookup.canonical_id,\n             \
                 CASE WHEN candidate.candidate_id IS NOT NULL THEN {fallback_hash} ELSE NULL END\n    \
             ) AS {canonical_id_name}\n\
         FROM (\n    \
             SELECT src.*, {candidate_id} AS candidate_id, {candidate_ns} AS candidate_ns\n    \
             FROM {src_ref} src\n\
         ) candidate\n\
         LEFT JOIN {lookup} lookup\n    \
             ON lookup.id = candidate.candidate_id AND lookup.id_key_type = candidate.candidate_ns",
    );

    Stage::new(format!("10_enrich_{}", table.short_name()), dialect.rewrite(&sql))
}
