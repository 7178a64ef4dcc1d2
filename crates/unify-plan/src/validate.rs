//! The validation predicate (spec §4.3.1):
//!
//! ```text
//! valid(col, key) ≡
//!       (valid_regexp is none  OR  regexp_like(cast(col as string), valid_regexp))
//!   AND (col is not null  when null is in invalid_texts)
//!   AND (cast(col as string) not in non_null_invalid_texts)
//! ```
//!
//! `TRUE` is used if both lists are empty.

use unify_config::Key;

/// Renders the `valid(col, key)` predicate as a SQL boolean expression.
pub fn valid_predicate(column: &str, key: &Key) -> String {
    let mut conditions = Vec::new();

    let non_null: Vec<&str> = key
        .invalid_texts
        .iter()
        .filter_map(|v| v.as_deref())
        .collect();
    if !non_null.is_empty() {
        let quoted = non_null
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        conditions.push(format!("CAST({column} AS STRING) NOT IN ({quoted})"));
    }

    let has_null = key.invalid_texts.iter().any(|v| v.is_none());
    if has_null {
        conditions.push(format!("CAST({column} AS STRING) IS NOT NULL"));
    }

    if let Some(regexp) = &key.valid_regexp {
        let escaped = regexp.replace('\'', "''");
        conditions.push(format!("regexp_like(CAST({column} AS STRING), '{escaped}')"));
    }

    if conditions.is_empty() {
        "TRUE".to_string()
    } else {
        format!("({})", conditions.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(invalid_texts: Vec<Option<&str>>, valid_regexp: Option<&str>) -> Key {
        Key {
            name: "email".to_string(),
            invalid_texts: invalid_texts.into_iter().map(|v| v.map(str::to_string)).collect(),
            valid_regexp: valid_regexp.map(str::to_string),
        }
    }

    #[test]
    fn empty_lists_yield_true() {
        assert_eq!(valid_predicate("c", &key(vec![], None)), "TRUE");
    }

    #[test]
    fn null_in_invalid_texts_requires_not_null() {
        let k = key(vec![Some(""), None], None);
        let pred = valid_predicate("c", &k);
        assert!(pred.contains("NOT IN ('')"));
        assert!(pred.contains("IS NOT NULL"));
    }

    #[test]
    fn valid_regexp_is_anded_in() {
        let k = key(vec![], Some(r"^[^@]+@[^@]+$"));
        let pred = valid_predicate("c", &k);
        assert!(pred.contains("regexp_like"));
    }
}
