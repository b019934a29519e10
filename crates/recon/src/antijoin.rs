use std::collections::HashSet;

use crate::error::ReconError;
use crate::key::{CompositeKey, KeyExtractor};
use crate::model::Table;

/// Rows of `table_a` whose key does not occur anywhere in `table_b`.
///
/// Both tables must have the same columns in the same order. Column types
/// must agree, except where one table's column holds no values at all; the
/// result keeps `table_a`'s schema. Each row of `table_a` is tested only against
/// `table_b`'s key set; repeated keys inside `table_a` are kept. Rows with a
/// null key part never match.
pub fn filter_duplicates<S: AsRef<str>>(
    table_a: &Table,
    table_b: &Table,
    key_columns: &[S],
) -> Result<Table, ReconError> {
    if !schemas_compatible(table_a, table_b) {
        return Err(ReconError::SchemaMismatch {
            left: table_a.schema().describe(),
            right: table_b.schema().describe(),
        });
    }

    let extractor = KeyExtractor::new(table_a.schema(), key_columns)?;
    let b_keys = key_set(table_b, &extractor);

    let filtered = table_a.filter(|record| !b_keys.contains(&extractor.extract(record)));
    log::debug!(
        "filter_duplicates: {} of {} rows removed ({} distinct keys in other table)",
        table_a.len() - filtered.len(),
        table_a.len(),
        b_keys.len()
    );
    Ok(filtered)
}

/// Same column names in order; a type difference is allowed only where one
/// side's column is entirely null.
fn schemas_compatible(table_a: &Table, table_b: &Table) -> bool {
    let (a, b) = (table_a.schema().columns(), table_b.schema().columns());
    a.len() == b.len()
        && a.iter().zip(b).enumerate().all(|(idx, (ca, cb))| {
            ca.name == cb.name
                && (ca.ty == cb.ty || table_a.is_null_column(idx) || table_b.is_null_column(idx))
        })
}

/// Distinct complete keys of `table`.
pub fn key_set(table: &Table, extractor: &KeyExtractor) -> HashSet<CompositeKey> {
    table
        .rows()
        .map(|r| extractor.extract(r))
        .filter(CompositeKey::is_complete)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Schema, Value, ValueType};

    fn k_table(keys: &[Option<i64>]) -> Table {
        let schema = Schema::from_pairs(&[("k", ValueType::Number)]).unwrap();
        Table::new(schema, keys.iter().map(|k| vec![Value::from(*k)]).collect()).unwrap()
    }

    #[test]
    fn removes_rows_keyed_in_other_table() {
        let a = k_table(&[Some(1), Some(2), Some(3)]);
        let b = k_table(&[Some(2)]);
        let out = filter_duplicates(&a, &b, &["k"]).unwrap();
        assert_eq!(out, k_table(&[Some(1), Some(3)]));
    }

    #[test]
    fn internal_duplicates_in_a_are_kept() {
        let a = k_table(&[Some(1), Some(1), Some(4)]);
        let b = k_table(&[Some(2), Some(3)]);
        let out = filter_duplicates(&a, &b, &["k"]).unwrap();
        assert_eq!(out, a);
    }

    #[test]
    fn null_keys_never_match() {
        let a = k_table(&[None, Some(1)]);
        let b = k_table(&[None, Some(1)]);
        let out = filter_duplicates(&a, &b, &["k"]).unwrap();
        assert_eq!(out, k_table(&[None]));
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let a = k_table(&[Some(1)]);
        let b = Table::new(
            Schema::from_pairs(&[("k", ValueType::Text)]).unwrap(),
            vec![vec!["1".into()]],
        )
        .unwrap();
        assert!(matches!(
            filter_duplicates(&a, &b, &["k"]),
            Err(ReconError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn mismatch_message_shows_types() {
        let a = k_table(&[Some(1)]);
        let b = Table::new(
            Schema::from_pairs(&[("k", ValueType::Text)]).unwrap(),
            vec![vec!["1".into()]],
        )
        .unwrap();
        let err = filter_duplicates(&a, &b, &["k"]).unwrap_err();
        assert_eq!(err.to_string(), "schema mismatch: [k: number] vs [k: text]");
    }

    #[test]
    fn blank_column_adopts_other_tables_type() {
        let schema = |gross: ValueType| {
            Schema::from_pairs(&[("title", ValueType::Text), ("gross", gross)]).unwrap()
        };
        let a = Table::new(
            schema(ValueType::Number),
            vec![vec!["Aladdin".into(), 217.0.into()], vec!["Frozen".into(), 400.0.into()]],
        )
        .unwrap();
        let b = Table::new(schema(ValueType::Text), vec![vec!["Aladdin".into(), Value::Null]]).unwrap();

        let out = filter_duplicates(&a, &b, &["title"]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.row(0).unwrap().get("title"), Some(&Value::from("Frozen")));
        assert_eq!(out.schema(), a.schema());
    }

    #[test]
    fn empty_other_table_keeps_everything() {
        let a = k_table(&[Some(1), Some(2)]);
        let b = k_table(&[]);
        assert_eq!(filter_duplicates(&a, &b, &["k"]).unwrap(), a);
    }
}
