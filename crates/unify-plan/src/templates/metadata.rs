use unify_config::CompiledConfig;
use unify_dialect::DialectOps;

use crate::naming;
use crate::stage::Stage;

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Stage `30_unification_metadata` (spec §4.3.8): records the canonical-ID
/// column name and its type tag.
pub fn render_unification_metadata(dialect: &dyn DialectOps, config: &CompiledConfig) -> Stage {
    let table = naming::unification_metadata();
    let columns = [("canonical_id_name", "STRING"), ("canonical_id_type", "STRING")]
        .into_iter()
        .map(|(n, t)| (n.to_string(), t.to_string()))
        .collect::<Vec<_>>();
    let create = dialect.create_or_replace_table(table, &columns);
    let insert = format!(
        "INSERT INTO {table} VALUES ({}, 'canonical_id')",
        quote(&config.canonical_id.name),
    );
    Stage::new("30_unification_metadata", dialect.rewrite(&format!("{create};\n\n{insert}")))
}

/// Stage `31_filter_lookup` (spec §4.3.8): one row per declared key with its
/// validation rule (`invalid_texts`, `valid_regexp`).
pub fn render_filter_lookup(dialect: &dyn DialectOps, config: &CompiledConfig) -> Stage {
    let table = naming::filter_lookup();
    let columns = [
        ("key_name", "STRING"),
        ("invalid_texts", "ARRAY<STRING>"),
        ("valid_regexp", "STRING"),
    ]
    .into_iter()
    .map(|(n, t)| (n.to_string(), t.to_string()))
    .collect::<Vec<_>>();
    let create = dialect.create_or_replace_table(table, &columns);

    let selects: Vec<String> = config
        .keys
        .iter()
        .map(|key| {
            let invalid_texts: Vec<String> = key
                .invalid_texts
                .iter()
                .map(|v| v.as_deref().map(quote).unwrap_or_else(|| "NULL".to_string()))
                .collect();
            let invalid_array = dialect.array_literal(&invalid_texts);
            let regexp = key
                .valid_regexp
                .as_deref()
                .map(quote)
                .unwrap_or_else(|| "CAST(NULL AS STRING)".to_string());
            format!(
                "SELECT {} AS key_name, {invalid_array} AS invalid_texts, {regexp} AS valid_regexp",
                quote(&key.name),
            )
        })
        .collect();

    let insert = if selects.is_empty() {
        format!("INSERT INTO {table} SELECT NULL, NULL, NULL WHERE FALSE")
    } else {
        format!("INSERT INTO {table}\n{}", selects.join("\nUNION ALL\n"))
    };

    Stage::new("31_filter_lookup", dialect.rewrite(&format!("{create};\n\n{insert}")))
}

/// Stage `32_column_lookup` (spec §4.3.8): `(database, table, column, key)`
/// bindings for every configured key column.
pub fn render_column_lookup(dialect: &dyn DialectOps, config: &CompiledConfig) -> Stage {
    let table = naming::column_lookup();
    let columns = [
        ("database_name", "STRING"),
        ("table_name", "STRING"),
        ("column_name", "STRING"),
        ("key_name", "STRING"),
    ]
    .into_iter()
    .map(|(n, t)| (n.to_string(), t.to_string()))
    .collect::<Vec<_>>();
    let create = dialect.create_or_replace_table(table, &columns);

    let rows: Vec<String> = config
        .tables
        .iter()
        .flat_map(|t| {
            let database = t.database.clone().unwrap_or_default();
            let short = t.short_name().to_string();
            t.key_columns.iter().map(move |kc| {
                format!(
                    "({}, {}, {}, {})",
                    quote(&database),
                    quote(&short),
                    quote(&kc.column),
                    quote(&kc.key),
                )
            })
        })
        .collect();

    let insert = if rows.is_empty() {
        format!("INSERT INTO {table} SELECT NULL, NULL, NULL, NULL WHERE FALSE")
    } else {
        format!(
            "INSERT INTO {table}\nSELECT database_name, table_name, column_name, key_name\nFROM (VALUES {}) AS t(database_name, table_name, column_name, key_name)",
            rows.join(", "),
        )
    };

    Stage::new("32_column_lookup", dialect.rewrite(&format!("{create};\n\n{insert}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use unify_config::Config;
    use unify_dialect::SnowflakeDialect;

    fn sample_config() -> CompiledConfig {
        Config::parse(
            r#"
keys:
  - name: email
    invalid_texts: ["", null]
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
        .unwrap()
    }

    #[test]
    fn unification_metadata_records_name() {
        let config = sample_config();
        let stage = render_unification_metadata(&SnowflakeDialect, &config);
        assert!(stage.sql.contains("'unified_id'"));
    }

    #[test]
    fn filter_lookup_includes_each_key() {
        let config = sample_config();
        let stage = render_filter_lookup(&SnowflakeDialect, &config);
        assert!(stage.sql.contains("'email'"));
    }

    #[test]
    fn column_lookup_includes_each_binding() {
        let config = sample_config();
        let stage = render_column_lookup(&SnowflakeDialect, &config);
        assert!(stage.sql.contains("'email_col'"));
        assert!(stage.sql.contains("'email'"));
    }
}
