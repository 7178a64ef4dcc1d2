use unify_dialect::DialectOps;

use crate::naming;
use crate::stage::Stage;

/// Stage `01_create_graph`: the `G_0` schema (spec §3.2).
pub fn render(dialect: &dyn DialectOps, prefix: &str) -> Stage {
    let table = naming::graph_iter(prefix, 0);
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

    let sql = dialect.create_or_replace_table(&table, &columns);
    Stage::new("01_create_graph", sql)
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use unify_dialect::SnowflakeDialect;

    use super::*;

    #[test]
    fn stage_file_name_snapshot() {
        let stage = render(&SnowflakeDialect, "unified_id");
        expect!["01_create_graph.sql"].assert_eq(&stage.file_name());
    }

    #[test]
    fn snowflake_graph_schema_has_expected_columns_in_order() {
        let stage = render(&SnowflakeDialect, "unified_id");
        assert!(stage.sql.starts_with("CREATE OR REPLACE TABLE unified_id_graph_unify_loop_0 ("));
        let expected_order = [
            "follower_id STRING",
            "follower_ns INT",
            "leader_id STRING",
            "leader_ns INT",
            "follower_first_seen_at BIGINT",
            "follower_last_seen_at BIGINT",
            "follower_source_table_ids ARRAY<INT>",
            "follower_last_processed_at BIGINT",
        ];
        let mut search_from = 0;
        for col in expected_order {
            let idx = stage.sql[search_from..].find(col).unwrap_or_else(|| panic!("missing column decl: {col}"));
            search_from += idx + col.len();
        }
    }
}
