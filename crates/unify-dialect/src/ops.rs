use regex::Regex;

/// The abstract SQL operator algebra a backend must supply (spec §4.2).
///
/// Stage templates in `unify-plan` are written entirely against this trait;
/// they never embed dialect-specific function names directly. Each method
/// returns the dialect's concrete SQL fragment for the given operand
/// expressions — this is the "DialectOps trait with one method per abstract
/// primitive" design note (SPEC_FULL §5.2).
///
/// A handful of purely cosmetic, one-off syntax differences that don't fit
/// the primitive-call model (e.g. `CAST(.. AS LONG)` vs `CAST(.. AS NUMBER)`)
/// are instead handled by [`DialectOps::rewrite`], a regex substitution
/// post-pass — the literal mechanism spec §6.3 calls "a dialect rewriter
/// layer applies a table of regex substitutions."
pub trait DialectOps: Send + Sync {
    fn name(&self) -> &'static str;

    // ---- Arrays --------------------------------------------------------
    /// Constructs an array literal from already-rendered element expressions.
    fn array_literal(&self, elements: &[String]) -> String;
    fn array_size(&self, arr: &str) -> String;
    fn array_distinct(&self, arr: &str) -> String;
    /// Flattens an array-of-arrays into a single array.
    fn array_flatten(&self, arr_of_arrays: &str) -> String;
    /// Drops `NULL` elements from an array.
    fn array_compact(&self, arr: &str) -> String;
    /// 0-based slice of `len` elements starting at `start`.
    fn array_slice(&self, arr: &str, start: i64, len: i64) -> String;
    fn array_contains(&self, arr: &str, elem: &str) -> String;
    /// 0-based element access.
    fn array_element(&self, arr: &str, index: i64) -> String {
        format!("{arr}[{index}]")
    }

    // ---- (id, ns) pair records embedded in arrays ----------------------
    fn pair_literal(&self, id_expr: &str, ns_expr: &str) -> String;
    /// Projects the `"id"` or `"ns"` field out of a pair expression
    /// produced by [`DialectOps::pair_literal`] (or an array element
    /// thereof). `as_type` is the scalar SQL type to cast the field to.
    fn pair_field(&self, pair_expr: &str, field: &str, as_type: &str) -> String;

    // ---- Aggregation ----------------------------------------------------
    fn agg_min(&self, expr: &str) -> String {
        format!("MIN({expr})")
    }
    fn agg_max(&self, expr: &str) -> String {
        format!("MAX({expr})")
    }
    fn agg_count(&self, expr: &str) -> String {
        format!("COUNT({expr})")
    }
    fn agg_count_if(&self, predicate: &str) -> String {
        format!("COUNT_IF({predicate})")
    }
    fn agg_bool_or(&self, expr: &str) -> String;
    fn agg_collect_set(&self, expr: &str) -> String {
        self.array_distinct(&self.agg_collect_list(expr))
    }
    fn agg_collect_list(&self, expr: &str) -> String;
    /// Collects `expr` into an array ordered by `order_by` descending —
    /// the array-valued-attribute equivalent of [`DialectOps::agg_max_by`]:
    /// same "value associated with a key" shape, but keeping the whole
    /// ranked list instead of just its head (spec §4.3.6's per-tier
    /// top-n-by-descending-order_value pack).
    fn agg_collect_list_ordered(&self, expr: &str, order_by: &str) -> String;
    /// `argmax(value BY key)` — the value associated with the maximal key.
    fn agg_max_by(&self, value: &str, key: &str) -> String;
    /// Concatenates grouped string values with `sep`, in iteration order.
    fn agg_string_agg(&self, expr: &str, sep: &str) -> String;

    /// 1-based `part` of `expr` split on `delimiter` (Snowflake `SPLIT_PART`
    /// semantics).
    fn split_part(&self, expr: &str, delimiter: &str, part: i64) -> String;

    // ---- Windowing -------------------------------------------------------
    fn window_min_over(&self, expr: &str, partition_by: &str) -> String {
        format!("MIN({expr}) OVER (PARTITION BY {partition_by})")
    }

    // ---- Lateral iteration ------------------------------------------------
    /// The `FROM`-clause fragment that explodes `array_expr` (already
    /// qualified, e.g. `t.id_ns_array`), binding each element to `alias`.
    fn lateral_explode(&self, array_expr: &str, alias: &str) -> String;

    // ---- Hashing / encoding ------------------------------------------------
    fn sha256_hex(&self, expr: &str) -> String;
    /// 1-based, inclusive `SUBSTR` matching SQL `SUBSTR(expr, start, len)`.
    fn substr(&self, expr: &str, start: i64, len: i64) -> String;
    /// Interprets a hex string as an unsigned 32-bit integer.
    fn hex_to_uint32(&self, hex_expr: &str) -> String;
    /// Renders an unsigned integer expression back as zero-padded 8-hex-digit
    /// uppercase text.
    fn uint32_to_hex(&self, int_expr: &str) -> String;
    /// Bitwise XOR of two 32-bit-unsigned-integer expressions.
    fn xor_uint32(&self, a: &str, b: &str) -> String;
    fn hex_to_binary(&self, hex_expr: &str) -> String;
    fn binary_concat(&self, parts: &[String]) -> String;
    fn base64_encode(&self, expr: &str) -> String;

    // ---- Time --------------------------------------------------------------
    fn current_epoch_seconds(&self) -> String;

    // ---- DDL -----------------------------------------------------------------
    fn create_or_replace_table(&self, name: &str, columns: &[(String, String)]) -> String;
    fn rename_table(&self, from: &str, to: &str) -> String;
    fn drop_table_if_exists(&self, name: &str) -> String;
    /// `GROUPING SETS ((a, b), (a), ())`-style clause over the given column
    /// tuples.
    fn grouping_sets(&self, tuples: &[Vec<String>]) -> String {
        let rendered: Vec<String> = tuples
            .iter()
            .map(|cols| format!("({})", cols.join(", ")))
            .collect();
        format!("GROUPING SETS ({})", rendered.join(", "))
    }

    /// One-off cosmetic regex rewrites applied after primitive rendering
    /// (spec §6.3). Empty by default.
    fn rewrite_table(&self) -> &[(Regex, &'static str)] {
        &[]
    }

    fn rewrite(&self, sql: &str) -> String {
        let mut out = sql.to_string();
        for (pattern, replacement) in self.rewrite_table() {
            out = pattern.replace_all(&out, *replacement).into_owned();
        }
        out
    }
}
