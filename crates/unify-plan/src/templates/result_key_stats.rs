use unify_config::CompiledConfig;
use unify_dialect::DialectOps;

use crate::naming;
use crate::stage::Stage;

/// Stage `06_result_key_stats` (spec §4.3.7): per-key leader counts and a
/// "followers per leader" frequency histogram over the canonicalized graph.
///
/// Reads the public `<prefix>_graph` table (renamed from
/// `graph_unify_loop_final` by stage `05_canonicalize`), not the internal
/// loop-alias name — mirroring the original's equivalent stage, which reads
/// from the table stage 05 just renamed.
pub fn render(dialect: &dyn DialectOps, config: &CompiledConfig, prefix: &str) -> Stage {
    let graph = naming::graph(prefix);
    let stats_table = naming::result_key_stats(prefix);

    let has_flags: Vec<String> = config
        .merge_key_ns
        .iter()
        .map(|(name, ns)| format!("{} AS has_{name}", dialect.agg_bool_or(&format!("follower_ns = {ns}"))))
        .collect();

    let distinct_with_cols: Vec<String> = config
        .merge_key_ns
        .keys()
        .map(|name| format!("{} AS distinct_with_{name}", dialect.agg_count_if(&format!("has_{name}"))))
        .collect();

    let histogram_entry = format!(
        "CONCAT(CAST(followers_per_leader AS STRING), ':', CAST(frequency AS STRING))"
    );
    let histogram_agg = dialect.agg_string_agg(&histogram_entry, ",");

    let sql = format!(
        "CREATE OR REPLACE TABLE {stats_table} AS\n\
         WITH per_leader AS (\n    \
             SELECT leader_id, leader_ns,\n           \
                    {count_star} AS followers_per_leader,\n           \
                    {has_flags}\n    \
             FROM {graph}\n    \
             GROUP BY leader_id, leader_ns\n\
         ),\n\
         histogram AS (\n    \
             SELECT followers_per_leader, {count_freq} AS frequency\n    \
             FROM per_leader\n    \
             GROUP BY followers_per_leader\n\
         )\n\
         SELECT\n    \
             {distinct_with_cols},\n    \
             (SELECT {histogram_agg} FROM histogram) AS followers_per_leader_histogram\n\
         FROM per_leader",
        count_star = dialect.agg_count("*"),
        has_flags = has_flags.join(",\n           "),
        count_freq = dialect.agg_count("*"),
        distinct_with_cols = distinct_with_cols.join(",\n    "),
    );

    Stage::new("06_result_key_stats", dialect.rewrite(&sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use unify_config::Config;
    use unify_dialect::SnowflakeDialect;

    #[test]
    fn reads_from_the_public_graph_table() {
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
"#,
        )
        .unwrap()
        .compile()
        .unwrap();
        let stage = render(&SnowflakeDialect, &config, "unified_id");
        assert!(stage.sql.contains("FROM unified_id_graph\n"));
        assert!(!stage.sql.contains("unified_id_graph_unify_loop_final"));
    }
}
