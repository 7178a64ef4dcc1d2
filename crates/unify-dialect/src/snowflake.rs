use std::sync::OnceLock;

use regex::Regex;

use crate::ops::DialectOps;

/// Snowflake backend, grounded directly in
/// `original_source/.../yaml_unification_to_snowflake.py`: `ARRAY_CONSTRUCT`,
/// `ARRAY_AGG(DISTINCT ..)`, `BOOLOR_AGG`, `LATERAL FLATTEN`,
/// `BASE64_ENCODE`/`TO_BINARY`/`BITXOR`/`SHA2`, `OBJECT_CONSTRUCT` +
/// `:field::type` projection.
#[derive(Debug, Default)]
pub struct SnowflakeDialect;

impl DialectOps for SnowflakeDialect {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn array_literal(&self, elements: &[String]) -> String {
        format!("ARRAY_CONSTRUCT({})", elements.join(", "))
    }

    fn array_size(&self, arr: &str) -> String {
        format!("ARRAY_SIZE({arr})")
    }

    fn array_distinct(&self, arr: &str) -> String {
        format!("ARRAY_DISTINCT({arr})")
    }

    fn array_flatten(&self, arr_of_arrays: &str) -> String {
        format!("ARRAY_FLATTEN({arr_of_arrays})")
    }

    fn array_compact(&self, arr: &str) -> String {
        format!("ARRAY_COMPACT({arr})")
    }

    fn array_slice(&self, arr: &str, start: i64, len: i64) -> String {
        format!("ARRAY_SLICE({arr}, {start}, {})", start + len)
    }

    fn array_contains(&self, arr: &str, elem: &str) -> String {
        format!("ARRAYS_OVERLAP({arr}, ARRAY_CONSTRUCT({elem}))")
    }

    fn pair_literal(&self, id_expr: &str, ns_expr: &str) -> String {
        format!("OBJECT_CONSTRUCT('id', {id_expr}, 'ns', {ns_expr})")
    }

    fn pair_field(&self, pair_expr: &str, field: &str, as_type: &str) -> String {
        format!("{pair_expr}:{field}::{as_type}")
    }

    fn split_part(&self, expr: &str, delimiter: &str, part: i64) -> String {
        format!("SPLIT_PART({expr}, '{delimiter}', {part})")
    }

    fn agg_bool_or(&self, expr: &str) -> String {
        format!("BOOLOR_AGG({expr})")
    }

    fn agg_collect_list(&self, expr: &str) -> String {
        format!("ARRAY_AGG({expr})")
    }

    fn agg_collect_list_ordered(&self, expr: &str, order_by: &str) -> String {
        format!("ARRAY_AGG({expr}) WITHIN GROUP (ORDER BY {order_by} DESC)")
    }

    fn agg_collect_set(&self, expr: &str) -> String {
        format!("ARRAY_AGG(DISTINCT {expr})")
    }

    fn agg_max_by(&self, value: &str, key: &str) -> String {
        format!("MAX_BY({value}, {key})")
    }

    fn agg_string_agg(&self, expr: &str, sep: &str) -> String {
        format!("LISTAGG({expr}, '{sep}')")
    }

    fn lateral_explode(&self, array_expr: &str, alias: &str) -> String {
        format!(", LATERAL FLATTEN(input => {array_expr}) {alias}")
    }

    fn sha256_hex(&self, expr: &str) -> String {
        format!("SHA2({expr}, 256)")
    }

    fn substr(&self, expr: &str, start: i64, len: i64) -> String {
        format!("SUBSTR({expr}, {start}, {len})")
    }

    fn hex_to_uint32(&self, hex_expr: &str) -> String {
        format!("TO_NUMBER({hex_expr}, 'XXXXXXXX')")
    }

    fn uint32_to_hex(&self, int_expr: &str) -> String {
        format!("LPAD(TO_CHAR({int_expr}, 'XXXXXXXX'), 8, '0')")
    }

    fn xor_uint32(&self, a: &str, b: &str) -> String {
        format!("BITXOR({a}, {b})")
    }

    fn hex_to_binary(&self, hex_expr: &str) -> String {
        format!("TO_BINARY({hex_expr}, 'HEX')")
    }

    fn binary_concat(&self, parts: &[String]) -> String {
        format!("CONCAT({})", parts.join(", "))
    }

    fn base64_encode(&self, expr: &str) -> String {
        format!("BASE64_ENCODE({expr})")
    }

    fn current_epoch_seconds(&self) -> String {
        "DATE_PART(epoch_second, CURRENT_TIMESTAMP())".to_string()
    }

    fn create_or_replace_table(&self, name: &str, columns: &[(String, String)]) -> String {
        let cols = columns
            .iter()
            .map(|(n, t)| format!("{n} {t}"))
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!("CREATE OR REPLACE TABLE {name} (\n    {cols}\n)")
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        format!("ALTER TABLE {from} RENAME TO {to}")
    }

    fn drop_table_if_exists(&self, name: &str) -> String {
        format!("DROP TABLE IF EXISTS {name}")
    }

    fn rewrite_table(&self) -> &[(Regex, &'static str)] {
        static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
        RULES.get_or_init(|| {
            vec![
                (Regex::new(r"(?i)CAST\s*\(\s*([^)]+?)\s+AS\s+LONG\s*\)").unwrap(), "CAST($1 AS NUMBER)"),
                (Regex::new(r"(?i)CAST\s*\(\s*([^)]+?)\s+AS\s+STRING\s*\)").unwrap(), "CAST($1 AS VARCHAR)"),
            ]
        })
    }
}
