use unify_config::{CompiledConfig, CompiledMasterTable};
use unify_dialect::DialectOps;

use crate::naming;
use crate::stage::Stage;

/// Stage `20_master_<table>` (spec §4.3.6): one row per canonical ID with
/// per-attribute priority/ordering resolution.
///
/// Grounded in `yaml_unification_to_snowflake.py`'s master-table section:
/// union the enriched source tables that contribute to any attribute,
/// projecting each attribute's contribution at its configured priority into
/// `<attr>_p<priority>_attr` / `<attr>_p<priority>_order` columns (`NULL`
/// where a table doesn't contribute at that priority), then resolve each
/// attribute with either an array pack (`array_elements` set) or a
/// priority-ordered `MAX_BY`/`COALESCE` chain.
pub fn render(dialect: &dyn DialectOps, config: &CompiledConfig, master: &CompiledMasterTable, prefix: &str) -> Stage {
    let lookup = naming::lookup(prefix);
    let master_table = &master.name;
    let master_tmp = format!("{master_table}_tmp");
    let canonical_id_name = &config.canonical_id.name;

    let mut tables_with_attrs: Vec<&str> = Vec::new();
    for attr in &master.attributes {
        for sc in &attr.source_columns {
            if !tables_with_attrs.contains(&sc.table.as_str()) {
                tables_with_attrs.push(&sc.table);
            }
        }
    }

    let union_parts: Vec<String> = tables_with_attrs
        .iter()
        .map(|&table_name| {
            let short = config
                .table(table_name)
                .map(|t| t.short_name())
                .unwrap_or(table_name);
            let enriched = naming::enriched(short);

            let mut cols = vec![canonical_id_name.clone()];
            for attr in &master.attributes {
                for sc in &attr.source_columns {
                    let attr_col = format!("{}_p{}_attr", attr.name, sc.priority);
                    let order_col = format!("{}_p{}_order", attr.name, sc.priority);
                    if sc.table == table_name {
                        cols.push(format!("{} AS {attr_col}", sc.column));
                        cols.push(format!("{} AS {order_col}", sc.order_by));
                    } else {
                        cols.push(format!("CAST(NULL AS STRING) AS {attr_col}"));
                        cols.push(format!("CAST(NULL AS BIGINT) AS {order_col}"));
                    }
                }
            }
            format!(
                "SELECT\n    {cols}\nFROM {enriched}\nWHERE {canonical_id_name} IS NOT NULL",
                cols = cols.join(",\n    "),
            )
        })
        .collect();

    if union_parts.is_empty() {
        let sql = format!(
            "CREATE OR REPLACE TABLE {master_tmp} AS\nSELECT {canonical_id_name} FROM {lookup} WHERE FALSE;\n\n{drop};\n{rename}",
            drop = dialect.drop_table_if_exists(master_table),
            rename = dialect.rename_table(&master_tmp, master_table),
        );
        return Stage::new(format!("20_master_{master_table}"), dialect.rewrite(&sql));
    }

    let union_sql = union_parts.join("\nUNION ALL\n");

    let attr_selections: Vec<String> = master
        .attributes
        .iter()
        .map(|attr| render_attribute(dialect, attr))
        .collect();

    let sql = format!(
        "CREATE OR REPLACE TABLE {master_tmp} AS\n\
         WITH us AS (\n{union_sql}\n),\n\
         attrs AS (\n    \
             SELECT\n        \
                 {canonical_id_name},\n        \
                 {attr_selections}\n    \
             FROM us\n    \
             GROUP BY {canonical_id_name}\n\
         )\n\
         SELECT * FROM attrs id_attrs\n\
         WHERE EXISTS (\n    \
             SELECT 1 FROM {lookup} ids WHERE ids.canonical_id = id_attrs.{canonical_id_name}\n\
         );\n\n\
         {drop};\n{rename}",
        attr_selections = attr_selections.join(",\n        "),
        drop = dialect.drop_table_if_exists(master_table),
        rename = dialect.rename_table(&master_tmp, master_table),
    );

    Stage::new(format!("20_master_{master_table}"), dialect.rewrite(&sql))
}

fn render_attribute(dialect: &dyn DialectOps, attr: &unify_config::CompiledMasterAttribute) -> String {
    if let Some(n) = attr.array_elements {
        let mut priorities: Vec<u32> = attr.source_columns.iter().map(|sc| sc.priority).collect();
        priorities.sort_unstable();
        priorities.dedup();

        let mut tiers: Vec<String> = priorities
            .into_iter()
            .map(|p| {
                let attr_col = format!("{}_p{p}_attr", attr.name);
                let order_col = format!("{}_p{p}_order", attr.name);
                let not_null = format!("CASE WHEN {attr_col} IS NOT NULL THEN {attr_col} END");
                let key = format!("CASE WHEN {attr_col} IS NOT NULL THEN {order_col} END");
                let ordered_collect = dialect.agg_collect_list_ordered(&not_null, &key);
                dialect.array_slice(&ordered_collect, 0, n as i64)
            })
            .collect();

        let concatenated = if tiers.len() == 1 {
            tiers.remove(0)
        } else {
            let first = tiers.remove(0);
            tiers.into_iter().fold(first, |acc, t| dialect.array_flatten(&dialect.array_literal(&[acc, t])))
        };
        let sliced = dialect.array_slice(&concatenated, 0, n as i64);
        format!("{sliced} AS {}", attr.name)
    } else if attr.source_columns.len() == 1 {
        let sc = &attr.source_columns[0];
        let attr_col = format!("{}_p{}_attr", attr.name, sc.priority);
        let order_col = format!("{}_p{}_order", attr.name, sc.priority);
        let value = format!("CASE WHEN {attr_col} IS NOT NULL THEN {attr_col} END");
        let key = format!("CASE WHEN {attr_col} IS NOT NULL THEN {order_col} END");
        format!("{} AS {}", dialect.agg_max_by(&value, &key), attr.name)
    } else {
        let mut priorities: Vec<u32> = attr.source_columns.iter().map(|sc| sc.priority).collect();
        priorities.sort_unstable();
        let parts: Vec<String> = priorities
            .into_iter()
            .map(|p| {
                let attr_col = format!("{}_p{p}_attr", attr.name);
                let order_col = format!("{}_p{p}_order", attr.name);
                let value = format!("CASE WHEN {attr_col} IS NOT NULL THEN {attr_col} END");
                let key = format!("CASE WHEN {attr_col} IS NOT NULL THEN {order_col} END");
                dialect.agg_max_by(&value, &key)
            })
            .collect();
        format!("COALESCE({}) AS {}", parts.join(", "), attr.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unify_config::Config;
    use unify_dialect::SnowflakeDialect;

    fn config_with_master(master_yaml: &str) -> CompiledConfig {
        Config::parse(&format!(
            r#"
keys:
  - name: email
tables:
  - table: events_a
    key_columns: [{{ column: email_col, key: email }}]
  - table: events_b
    key_columns: [{{ column: email_col, key: email }}]
canonical_ids:
  - merge_by_keys: [email]
master_tables:
{master_yaml}
"#
        ))
        .unwrap()
        .compile()
        .unwrap()
    }

    #[test]
    fn array_attribute_orders_each_tier_by_order_col_descending() {
        let config = config_with_master(
            r#"
  - name: customers
    canonical_id: unified_id
    attributes:
      - name: recent_emails
        array_elements: 3
        source_columns:
          - { table: events_a, column: email_col, priority: 1, order_by: ts }
          - { table: events_b, column: email_col, priority: 2, order_by: ts }
"#,
        );
        let master = &config.master_tables[0];
        let stage = render(&SnowflakeDialect, &config, master, "unified_id");
        assert!(stage.sql.contains("WITHIN GROUP (ORDER BY"));
        assert!(stage.sql.contains("recent_emails_p1_order"));
        assert!(stage.sql.contains("recent_emails_p2_order"));
    }

    #[test]
    fn single_priority_scalar_attribute_uses_max_by() {
        let config = config_with_master(
            r#"
  - name: customers
    canonical_id: unified_id
    attributes:
      - name: best_email
        source_columns:
          - { table: events_a, column: email_col }
"#,
        );
        let master = &config.master_tables[0];
        let stage = render(&SnowflakeDialect, &config, master, "unified_id");
        assert!(stage.sql.contains("MAX_BY("));
        assert!(!stage.sql.contains("COALESCE("));
    }

    #[test]
    fn multi_priority_scalar_attribute_coalesces_max_by_chain() {
        let config = config_with_master(
            r#"
  - name: customers
    canonical_id: unified_id
    attributes:
      - name: best_email
        source_columns:
          - { table: events_a, column: email_col, priority: 1 }
          - { table: events_b, column: email_col, priority: 2 }
"#,
        );
        let master = &config.master_tables[0];
        let stage = render(&SnowflakeDialect, &config, master, "unified_id");
        assert!(stage.sql.contains("COALESCE(MAX_BY("));
    }
}
