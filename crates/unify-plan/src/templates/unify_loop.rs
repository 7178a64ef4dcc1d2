use unify_dialect::DialectOps;

use crate::naming;

/// Builds the `CASE leader_ns WHEN 1 THEN p1 .. ELSE leader_ns END` priority
/// projection (spec §4.3.3 step 2), grounded in the original's
/// `array[1,2,3][leader_ns]` emulation via `CASE`.
fn priority_case_sql(priorities: &[u32]) -> String {
    let arms: Vec<String> = priorities
        .iter()
        .enumerate()
        .map(|(i, p)| format!("WHEN {} THEN {p}", i + 1))
        .collect();
    format!("CASE leader_ns {} ELSE leader_ns END", arms.join(" "))
}

/// Stage `04.k`: computes `G_k` from `G_{k-1}` (spec §4.3.3).
pub fn render(dialect: &dyn DialectOps, _target: &str, prefix: &str, k: u32, priorities: &[u32]) -> String {
    let curr = naming::graph_iter(prefix, k);
    let prev = naming::graph_iter(prefix, k - 1);

    let columns = [
        ("follower_id", "STRING"),
        ("follower_ns", "INT"),
        ("leader_id", "STRING"),
        ("leader_ns", "INT"),
        ("follower_first_seen_at", "BIGINT"),
        ("follower_last_seen_at", "BIGINT"),
        ("follower_source_table_ids", "ARRAY<INT>"),
        ("follower_last_processed_at", "BIGINT"),
    ]
    .into_iter()
    .map(|(n, t)| (n.to_string(), t.to_string()))
    .collect::<Vec<_>>();
    let create = dialect.create_or_replace_table(&curr, &columns);

    let priority_case = priority_case_sql(priorities);
    let leader_key = format!("LPAD(CAST({priority_case} AS STRING), 3, '0') || '|' || leader_id");

    let now = dialect.current_epoch_seconds();
    let source_ids_distinct = dialect.array_distinct(&dialect.agg_collect_set("flattened.value"));
    let flatten_ids = dialect.lateral_explode("promoted.follower_source_table_ids", "flattened");

    let new_leader_id = dialect.split_part("diff.newer_leader_key", "|", 2);
    let new_leader_ns = dialect.split_part("diff.newer_leader_key", "|", 1);

    let insert = format!(
        "INSERT INTO {curr}\n\
         WITH h AS (\n    \
             SELECT follower_id, follower_ns, leader_id, leader_ns,\n           \
                    follower_first_seen_at, follower_last_seen_at,\n           \
                    follower_source_table_ids, follower_last_processed_at\n    \
             FROM {prev}\n\
             UNION ALL\n    \
             SELECT followers.follower_id, followers.follower_ns, leaders.leader_id, leaders.leader_ns,\n           \
                    followers.follower_first_seen_at, followers.follower_last_seen_at,\n           \
                    followers.follower_source_table_ids, followers.follower_last_processed_at\n    \
             FROM (SELECT DISTINCT leader_id, leader_ns FROM {prev}) leaders\n    \
             JOIN (\n        \
                 SELECT follower_id, follower_ns, follower_first_seen_at, follower_last_seen_at,\n               \
                        follower_source_table_ids, follower_last_processed_at\n        \
                 FROM {prev}\n    \
             ) followers\n    \
             ON leaders.leader_id = followers.follower_id AND leaders.leader_ns = followers.follower_ns\n\
         ),\n\
         ranked AS (\n    \
             SELECT h.*, {leader_key} AS leader_key FROM h\n\
         ),\n\
         promotions AS (\n    \
             SELECT DISTINCT\n        \
                 older_leader_key,\n        \
                 MIN(newer_leader_key) AS newer_leader_key\n    \
             FROM (\n        \
                 SELECT\n            \
                     leader_key AS older_leader_key,\n            \
                     MIN(leader_key) OVER (PARTITION BY follower_id, follower_ns) AS newer_leader_key\n        \
                 FROM ranked\n    \
             ) windowed\n    \
             WHERE older_leader_key > newer_leader_key\n    \
             GROUP BY older_leader_key\n\
         ),\n\
         promoted AS (\n    \
             SELECT\n        \
                 ranked.follower_id, ranked.follower_ns,\n        \
                 COALESCE({new_leader_id}, ranked.leader_id) AS leader_id,\n        \
                 COALESCE(CAST({new_leader_ns} AS INT), ranked.leader_ns) AS leader_ns,\n        \
                 ranked.follower_first_seen_at, ranked.follower_last_seen_at,\n        \
                 ranked.follower_source_table_ids,\n        \
                 CASE WHEN diff.newer_leader_key IS NULL THEN ranked.follower_last_processed_at ELSE {now} END\n            \
                     AS follower_last_processed_at\n    \
             FROM ranked\n    \
             LEFT JOIN promotions diff ON diff.older_leader_key = ranked.leader_key\n\
         )\n\
         SELECT\n    \
             follower_id, follower_ns, leader_id, leader_ns,\n    \
             {first_seen} AS follower_first_seen_at,\n    \
             {last_seen} AS follower_last_seen_at,\n    \
             {source_ids} AS follower_source_table_ids,\n    \
             {last_processed} AS follower_last_processed_at\n\
         FROM promoted{flatten_ids}\n\
         GROUP BY follower_id, follower_ns, leader_id, leader_ns",
        first_seen = dialect.agg_min("promoted.follower_first_seen_at"),
        last_seen = dialect.agg_max("promoted.follower_last_seen_at"),
        source_ids = source_ids_distinct,
        last_processed = dialect.agg_max("promoted.follower_last_processed_at"),
    );

    dialect.rewrite(&format!("{create};\n\n{insert}"))
}

/// The convergence query between `G_k` and `G_{k-1}` (spec §4.4 step 4):
/// `COUNT(*)` of the symmetric set difference on the follower/leader
/// projection. Zero means converged.
pub fn convergence_query(_target: &str, prefix: &str, k: u32) -> String {
    let curr = naming::graph_iter(prefix, k);
    let prev = naming::graph_iter(prefix, k - 1);
    let projection = "follower_ns, follower_id, leader_ns, leader_id";
    format!(
        "SELECT COUNT(*) FROM (\n    \
             SELECT {projection} FROM {curr}\n    \
             EXCEPT\n    \
             SELECT {projection} FROM {prev}\n\
         ) diff",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use unify_dialect::SnowflakeDialect;

    #[test]
    fn priority_case_defaults_identity_beyond_table() {
        let sql = priority_case_sql(&[2, 1]);
        assert!(sql.contains("WHEN 1 THEN 2"));
        assert!(sql.contains("WHEN 2 THEN 1"));
        assert!(sql.contains("ELSE leader_ns"));
    }

    #[test]
    fn render_references_prev_and_curr_tables() {
        let d = SnowflakeDialect;
        let sql = render(&d, "unified_id", "unified_id", 3, &[1, 2]);
        assert!(sql.contains("unified_id_graph_unify_loop_3"));
        assert!(sql.contains("unified_id_graph_unify_loop_2"));
    }

    #[test]
    fn convergence_query_uses_except() {
        let sql = convergence_query("unified_id", "unified_id", 2);
        assert!(sql.contains("EXCEPT"));
        assert!(sql.contains("unified_id_graph_unify_loop_2"));
        assert!(sql.contains("unified_id_graph_unify_loop_1"));
    }
}
