use unify_config::CompiledConfig;
use unify_dialect::DialectOps;

use crate::naming;
use crate::stage::Stage;

/// Stage `03_source_key_stats` (spec §4.3.7): grouping-sets over per-table
/// contribution flags; total-distinct leaders and per-key distinct
/// followers, plus a wildcard `*` bucket (the empty grouping set).
///
/// `G_0` can legitimately hold several rows per `(follower_id, follower_ns)`
/// — one per candidate leader the follower was seeded with, before the
/// unify loop merges them (`extract_merge.rs`'s per-follower
/// `collect_set(leaders)` re-exploded). The per-key/per-table counts below
/// must count distinct followers, not rows, so followers are first
/// collapsed to one row each (`distinct_followers`), matching the original's
/// two-subquery structure (`GROUP BY follower_id, follower_ns` before
/// `COUNT_IF`) and the dedup `result_key_stats.rs` already does via its
/// `per_leader` CTE.
pub fn render(dialect: &dyn DialectOps, config: &CompiledConfig, prefix: &str) -> Stage {
    let graph0 = naming::graph_iter(prefix, 0);
    let stats_table = naming::source_key_stats(prefix);

    let flag_cols: Vec<String> = config
        .tables
        .iter()
        .map(|t| {
            let contains = dialect.array_contains("follower_source_table_ids", &t.table_id.to_string());
            format!("{contains} AS contributes_table_{}", t.table_id)
        })
        .collect();
    let flag_names: Vec<String> = config
        .tables
        .iter()
        .map(|t| format!("contributes_table_{}", t.table_id))
        .collect();

    let distinct_leader_key = "CONCAT(CAST(leader_ns AS STRING), '|', leader_id)";
    let distinct_leaders = dialect.agg_count(&format!("DISTINCT {distinct_leader_key}"));
    // Uncorrelated scalar subquery: a single count over the whole (raw,
    // non-deduped) graph, independent of the outer GROUP BY — COUNT(DISTINCT
    // ..) already absorbs the per-follower row duplication, so it needs no
    // dedup pass of its own and must not be joined row-wise against
    // `flagged` (that would multiply follower rows by the leader count).
    let distinct_leaders_scalar = format!("(SELECT {distinct_leaders} FROM {graph0})");

    let per_key_cols: Vec<String> = config
        .merge_key_ns
        .iter()
        .map(|(name, ns)| {
            let count = dialect.agg_count_if(&format!("follower_ns = {ns}"));
            format!("{count} AS distinct_with_{name}")
        })
        .collect();

    let mut grouping_tuples: Vec<Vec<String>> = vec![Vec::new()]; // wildcard `*` bucket
    grouping_tuples.push(flag_names.clone());

    let select_cols = flag_names
        .iter()
        .cloned()
        .chain(std::iter::once(format!("{distinct_leaders_scalar} AS distinct_leaders")))
        .chain(per_key_cols)
        .collect::<Vec<_>>()
        .join(",\n    ");

    let grouping_sets = dialect.grouping_sets(&grouping_tuples);

    let source_ids_dedup = dialect.array_distinct(&dialect.array_flatten(&dialect.agg_collect_list("follower_source_table_ids")));

    let sql = format!(
        "CREATE OR REPLACE TABLE {stats_table} AS\n\
         WITH distinct_followers AS (\n    \
             SELECT\n        \
                 follower_id,\n        \
                 follower_ns,\n        \
                 {source_ids_dedup} AS follower_source_table_ids\n    \
             FROM {graph0}\n    \
             GROUP BY follower_id, follower_ns\n\
         )\n\
         SELECT\n    {select_cols}\n\
         FROM (\n    \
             SELECT *, {flags}\n    FROM distinct_followers\n\
         ) flagged\n\
         GROUP BY {grouping_sets}",
        flags = flag_cols.join(", "),
    );

    Stage::new("03_source_key_stats", dialect.rewrite(&sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use unify_config::Config;
    use unify_dialect::SnowflakeDialect;

    fn two_table_config() -> CompiledConfig {
        Config::parse(
            r#"
keys:
  - name: email
  - name: phone
tables:
  - table: a
    key_columns:
      - { column: email_col, key: email }
  - table: b
    key_columns:
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
    fn followers_are_deduped_before_distinct_with_counts() {
        let config = two_table_config();
        let stage = render(&SnowflakeDialect, &config, "unified_id");
        assert!(stage.sql.contains("GROUP BY follower_id, follower_ns"));
        assert!(stage.sql.contains("distinct_followers"));
        assert!(stage.sql.contains("FROM (\n    SELECT *,"));
    }

    #[test]
    fn distinct_leaders_is_an_uncorrelated_scalar_subquery() {
        let config = two_table_config();
        let stage = render(&SnowflakeDialect, &config, "unified_id");
        assert!(stage.sql.contains("(SELECT COUNT(DISTINCT"));
        assert!(stage.sql.contains("FROM unified_id_graph_unify_loop_0) AS distinct_leaders"));
    }

    #[test]
    fn emits_grouping_sets_with_wildcard_and_per_table_buckets() {
        let config = two_table_config();
        let stage = render(&SnowflakeDialect, &config, "unified_id");
        assert!(stage.sql.contains("GROUPING SETS ((), (contributes_table_1, contributes_table_2))"));
    }
}
