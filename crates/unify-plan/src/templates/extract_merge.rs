use unify_config::CompiledConfig;
use unify_dialect::DialectOps;

use crate::naming;
use crate::stage::Stage;
use crate::validate::valid_predicate;

/// The per-table `SELECT` that projects each row into an array of `(id, ns)`
/// pairs, one entry per configured merge-key column that validates, plus the
/// row's `time` and `table_id` (spec §4.3.1).
fn extract_table_sql(
    dialect: &dyn DialectOps,
    config: &CompiledConfig,
    table: &unify_config::CompiledSourceTable,
    src_table_ref: &str,
) -> String {
    let mut key_columns: Vec<_> = table
        .key_columns
        .iter()
        .filter_map(|kc| config.ns_of(&kc.key).map(|ns| (kc, ns)))
        .collect();
    key_columns.sort_by_key(|(_, ns)| *ns);

    if key_columns.is_empty() {
        let pairs_type = dialect.array_literal(&[]);
        return format!(
            "SELECT {pairs_type} AS id_ns_array, {time} AS time, {tid} AS source_table_id\nFROM {src_table_ref}\nWHERE FALSE",
            pairs_type = pairs_type,
            time = table.time_column,
            tid = table.table_id,
        );
    }

    let case_exprs: Vec<String> = key_columns
        .iter()
        .map(|(kc, ns)| {
            let key = config.key(&kc.key).expect("validated by Config::validate");
            let predicate = valid_predicate(&kc.column, key);
            let pair = dialect.pair_literal(&format!("CAST({} AS STRING)", kc.column), &ns.to_string());
            format!("CASE WHEN {predicate} THEN {pair} ELSE NULL END")
        })
        .collect();

    let array = dialect.array_compact(&dialect.array_literal(&case_exprs));

    format!(
        "SELECT {array} AS id_ns_array, {time} AS time, {tid} AS source_table_id\nFROM {src_table_ref}\nWHERE TRUE",
        array = array,
        time = table.time_column,
        tid = table.table_id,
    )
}

/// Stage `02_extract_merge`: seeds `G_0` from sources (spec §4.3.1).
pub fn render(
    dialect: &dyn DialectOps,
    config: &CompiledConfig,
    prefix: &str,
    src_catalog: &str,
    src_schema: &str,
) -> Stage {
    let graph0 = naming::graph_iter(prefix, 0);

    let per_table: Vec<String> = config
        .tables
        .iter()
        .map(|t| {
            let src_ref = match &t.database {
                Some(db) => naming::qualified(db, src_schema, t.short_name()),
                None => naming::qualified(src_catalog, src_schema, t.short_name()),
            };
            extract_table_sql(dialect, config, t, &src_ref)
        })
        .collect();
    let union_sql = per_table.join("\nUNION ALL\n");

    let exploded_lateral = dialect.lateral_explode("extracted.id_ns_array", "f");
    let follower_id = dialect.pair_field("f.value", "id", "STRING");
    let follower_ns = dialect.pair_field("f.value", "ns", "INT");
    let first_element = dialect.array_element("extracted.id_ns_array", 0);
    let row_leader_id = dialect.pair_field(&first_element, "id", "STRING");
    let row_leader_ns = dialect.pair_field(&first_element, "ns", "INT");
    let now = dialect.current_epoch_seconds();
    let leader_pair = dialect.pair_literal("per_row.leader_id", "per_row.leader_ns");
    let leaders_set = dialect.agg_collect_set(&leader_pair);
    let source_ids_set = dialect.agg_collect_set("per_row.source_table_id");
    let first_seen = dialect.agg_min("per_row.first_seen_at");
    let last_seen = dialect.agg_max("per_row.last_seen_at");
    let last_processed = dialect.agg_max("per_row.last_processed_at");
    let leaders_explode = dialect.lateral_explode("grouped.leaders", "lf");
    let leader_id_out = dialect.pair_field("lf.value", "id", "STRING");
    let leader_ns_out = dialect.pair_field("lf.value", "ns", "INT");

    let sql = format!(
        "INSERT INTO {graph0}\n\
         SELECT\n    \
             grouped.follower_id,\n    \
             grouped.follower_ns,\n    \
             {leader_id_out} AS leader_id,\n    \
             {leader_ns_out} AS leader_ns,\n    \
             grouped.follower_first_seen_at,\n    \
             grouped.follower_last_seen_at,\n    \
             grouped.follower_source_table_ids,\n    \
             grouped.follower_last_processed_at\n\
         FROM (\n    \
             SELECT\n        \
                 per_row.follower_id,\n        \
                 per_row.follower_ns,\n        \
                 {leaders_set} AS leaders,\n        \
                 {source_ids_set} AS follower_source_table_ids,\n        \
                 {first_seen} AS follower_first_seen_at,\n        \
                 {last_seen} AS follower_last_seen_at,\n        \
                 {last_processed} AS follower_last_processed_at\n    \
             FROM (\n        \
                 SELECT\n            \
                     {follower_id} AS follower_id,\n            \
                     {follower_ns} AS follower_ns,\n            \
                     {row_leader_id} AS leader_id,\n            \
                     {row_leader_ns} AS leader_ns,\n            \
                     extracted.time AS first_seen_at,\n            \
                     extracted.time AS last_seen_at,\n            \
                     extracted.source_table_id,\n            \
                     {now} AS last_processed_at\n        \
                 FROM (\n{union_sql}\n        \
                 ) extracted{exploded_lateral}\n    \
             ) per_row\n    \
             GROUP BY per_row.follower_id, per_row.follower_ns\n\
         ) grouped{leaders_explode}",
    );

    Stage::new("02_extract_merge", dialect.rewrite(&sql))
}
