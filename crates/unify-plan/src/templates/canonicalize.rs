use unify_config::CompiledConfig;
use unify_dialect::DialectOps;

use crate::canonical_id::KEY_MASKS;
use crate::naming;
use crate::stage::Stage;

/// Renders the canonical-ID hash expression over `leader_expr` joined
/// against a `masks` CTE exposing `key_mask` for the row's `leader_ns`
/// (spec §4.3.4).
pub(crate) fn canonical_id_expr(dialect: &dyn DialectOps, leader_expr: &str, mask_expr: &str) -> String {
    let sha = dialect.sha256_hex(leader_expr);
    let first16 = dialect.substr(&sha, 1, 16);
    // `first16` is referenced twice; a SQL engine re-evaluates the
    // expression each time it's inlined, exactly as the original scripts do.
    let half_a = dialect.substr(&first16, 1, 8);
    let half_b = dialect.substr(&first16, 9, 8);
    let mask_a = dialect.substr(mask_expr, 1, 8);
    let mask_b = dialect.substr(mask_expr, 9, 8);

    let xored_a = dialect.uint32_to_hex(&dialect.xor_uint32(&dialect.hex_to_uint32(&half_a), &dialect.hex_to_uint32(&mask_a)));
    let xored_b = dialect.uint32_to_hex(&dialect.xor_uint32(&dialect.hex_to_uint32(&half_b), &dialect.hex_to_uint32(&mask_b)));
    let mask_high = dialect.substr(mask_expr, 17, 2);

    let binary = dialect.binary_concat(&[
        dialect.hex_to_binary(&format!("{xored_a} || {xored_b}")),
        dialect.hex_to_binary(&mask_high),
    ]);
    let encoded = dialect.base64_encode(&binary);
    format!("REPLACE(REPLACE(REPLACE({encoded}, '+', '-'), '/', '_'), '=', '')")
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Stage `05_canonicalize` (spec §4.3.4): materializes `canonical_id_lookup`,
/// the `keys` (`ns` → key name) and `tables` (`table_id` → table name)
/// lookups from the resolved config, then atomically replaces all four
/// public names — `lookup`, `keys`, `tables`, and the converged `graph`
/// itself (renamed from the internal `graph_unify_loop_final` alias) — via
/// drop-and-rename, grounded in the original's stage-05 commit block's four
/// drop+rename pairs.
pub fn render(dialect: &dyn DialectOps, config: &CompiledConfig, prefix: &str) -> Stage {
    let graph_final = naming::graph_final(prefix);
    let graph_public = naming::graph(prefix);
    let lookup = naming::lookup(prefix);
    let lookup_tmp = format!("{lookup}_tmp");
    let keys_table = naming::keys_table(prefix);
    let keys_tmp = format!("{keys_table}_tmp");
    let tables_table = naming::tables_table(prefix);
    let tables_tmp = format!("{tables_table}_tmp");

    let num_keys = config.canonical_id.merge_by_keys.len().max(1);
    let mask_values: Vec<String> = (1..=num_keys)
        .map(|ns| format!("({ns}, '{}')", KEY_MASKS[ns - 1]))
        .collect();

    let canonical_id = canonical_id_expr(dialect, "graph.leader_id", "masks.key_mask");

    let lookup_create = format!(
        "CREATE OR REPLACE TABLE {lookup_tmp} AS\n\
         SELECT\n    \
             {canonical_id} AS canonical_id,\n    \
             graph.follower_id AS id,\n    \
             graph.follower_ns AS id_key_type,\n    \
             agg.canonical_id_first_seen_at,\n    \
             agg.canonical_id_last_seen_at,\n    \
             graph.follower_first_seen_at AS id_first_seen_at,\n    \
             graph.follower_last_seen_at AS id_last_seen_at,\n    \
             graph.follower_source_table_ids AS id_source_table_ids,\n    \
             graph.follower_last_processed_at AS id_last_processed_at\n\
         FROM {graph_final} graph\n\
         JOIN (\n    \
             SELECT * FROM (VALUES {values}) AS t(ns, key_mask)\n\
         ) masks ON masks.ns = graph.leader_ns\n\
         JOIN (\n    \
             SELECT leader_id, leader_ns,\n           \
                    {first_seen} AS canonical_id_first_seen_at,\n           \
                    {last_seen} AS canonical_id_last_seen_at\n    \
             FROM {graph_final}\n    \
             GROUP BY leader_id, leader_ns\n\
         ) agg ON agg.leader_id = graph.leader_id AND agg.leader_ns = graph.leader_ns",
        values = mask_values.join(", "),
        first_seen = dialect.agg_min("follower_first_seen_at"),
        last_seen = dialect.agg_max("follower_last_seen_at"),
    );

    let keys_columns = [("ns".to_string(), "INT".to_string()), ("key_name".to_string(), "STRING".to_string())];
    let keys_rows: Vec<String> = config
        .canonical_id
        .merge_by_keys
        .iter()
        .enumerate()
        .map(|(i, name)| format!("({}, {})", i + 1, quote(name)))
        .collect();
    let keys_create = format!(
        "{ddl};\n\n{insert}",
        ddl = dialect.create_or_replace_table(&keys_tmp, &keys_columns),
        insert = if keys_rows.is_empty() {
            format!("INSERT INTO {keys_tmp} SELECT NULL, NULL WHERE FALSE")
        } else {
            format!(
                "INSERT INTO {keys_tmp}\nSELECT ns, key_name FROM (VALUES {}) AS t(ns, key_name)",
                keys_rows.join(", "),
            )
        },
    );

    let tables_columns = [("table_id".to_string(), "INT".to_string()), ("table_name".to_string(), "STRING".to_string())];
    let tables_rows: Vec<String> = config
        .tables
        .iter()
        .map(|t| format!("({}, {})", t.table_id, quote(t.short_name())))
        .collect();
    let tables_create = format!(
        "{ddl};\n\n{insert}",
        ddl = dialect.create_or_replace_table(&tables_tmp, &tables_columns),
        insert = if tables_rows.is_empty() {
            format!("INSERT INTO {tables_tmp} SELECT NULL, NULL WHERE FALSE")
        } else {
            format!(
                "INSERT INTO {tables_tmp}\nSELECT table_id, table_name FROM (VALUES {}) AS t(table_id, table_name)",
                tables_rows.join(", "),
            )
        },
    );

    let commit = format!(
        "{drop_lookup};\n{rename_lookup};\n\n{drop_keys};\n{rename_keys};\n\n{drop_tables};\n{rename_tables};\n\n{drop_graph};\n{rename_graph}",
        drop_lookup = dialect.drop_table_if_exists(&lookup),
        rename_lookup = dialect.rename_table(&lookup_tmp, &lookup),
        drop_keys = dialect.drop_table_if_exists(&keys_table),
        rename_keys = dialect.rename_table(&keys_tmp, &keys_table),
        drop_tables = dialect.drop_table_if_exists(&tables_table),
        rename_tables = dialect.rename_table(&tables_tmp, &tables_table),
        drop_graph = dialect.drop_table_if_exists(&graph_public),
        rename_graph = dialect.rename_table(&graph_final, &graph_public),
    );

    Stage::new(
        "05_canonicalize",
        dialect.rewrite(&format!("{lookup_create};\n\n{keys_create};\n\n{tables_create};\n\n{commit}")),
    )
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
  - name: phone
tables:
  - table: events
    key_columns:
      - { column: email_col, key: email }
canonical_ids:
  - merge_by_keys: [email, phone]
"#,
        )
        .unwrap()
        .compile()
        .unwrap()
    }

    #[test]
    fn commits_lookup_keys_tables_and_graph() {
        let config = two_key_config();
        let stage = render(&SnowflakeDialect, &config, "unified_id");
        assert!(stage.sql.contains("unified_id_lookup_tmp"));
        assert!(stage.sql.contains("unified_id_keys_tmp"));
        assert!(stage.sql.contains("unified_id_tables_tmp"));
        assert!(stage.sql.contains("ALTER TABLE unified_id_lookup_tmp RENAME TO unified_id_lookup"));
        assert!(stage.sql.contains("ALTER TABLE unified_id_keys_tmp RENAME TO unified_id_keys"));
        assert!(stage.sql.contains("ALTER TABLE unified_id_tables_tmp RENAME TO unified_id_tables"));
        assert!(stage.sql.contains("ALTER TABLE unified_id_graph_unify_loop_final RENAME TO unified_id_graph"));
    }

    #[test]
    fn keys_table_rows_carry_namespace_and_name() {
        let config = two_key_config();
        let stage = render(&SnowflakeDialect, &config, "unified_id");
        assert!(stage.sql.contains("(1, 'email')"));
        assert!(stage.sql.contains("(2, 'phone')"));
    }

    #[test]
    fn tables_table_rows_carry_table_id_and_short_name() {
        let config = two_key_config();
        let stage = render(&SnowflakeDialect, &config, "unified_id");
        assert!(stage.sql.contains("(1, 'events')"));
    }
}
