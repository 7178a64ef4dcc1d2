//! Table-name construction (spec §6.4: "all names prefixed by
//! `<canonical_id_name>_` unless noted").

pub fn qualified(catalog: &str, schema: &str, table: &str) -> String {
    format!("{catalog}.{schema}.{table}")
}

pub fn graph_iter(prefix: &str, k: u32) -> String {
    format!("{prefix}_graph_unify_loop_{k}")
}

pub fn graph_final(prefix: &str) -> String {
    format!("{prefix}_graph_unify_loop_final")
}

pub fn graph(prefix: &str) -> String {
    format!("{prefix}_graph")
}

pub fn lookup(prefix: &str) -> String {
    format!("{prefix}_lookup")
}

pub fn keys_table(prefix: &str) -> String {
    format!("{prefix}_keys")
}

pub fn tables_table(prefix: &str) -> String {
    format!("{prefix}_tables")
}

pub fn source_key_stats(prefix: &str) -> String {
    format!("{prefix}_source_key_stats")
}

pub fn result_key_stats(prefix: &str) -> String {
    format!("{prefix}_result_key_stats")
}

pub fn enriched(table_short_name: &str) -> String {
    format!("enriched_{table_short_name}")
}

pub fn unification_metadata() -> &'static str {
    "unification_metadata"
}

pub fn filter_lookup() -> &'static str {
    "filter_lookup"
}

pub fn column_lookup() -> &'static str {
    "column_lookup"
}
