use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ReconError;
use crate::key::{CompositeKey, KeyExtractor};
use crate::model::{Record, Schema, Table, Value};

/// Left outer join on `on`.
///
/// Each left row yields one row per matching right row (in right-table
/// order), or a single row padded with nulls when nothing matches. Output
/// columns are the left columns followed by the right table's non-key columns.
pub fn left_join<S: AsRef<str>>(left: &Table, right: &Table, on: &[S]) -> Result<Table, ReconError> {
    let left_keys = KeyExtractor::new(left.schema(), on)?;
    let right_keys = KeyExtractor::new(right.schema(), on)?;

    for (&li, &ri) in left_keys.indices().iter().zip(right_keys.indices()) {
        let (lc, rc) = (&left.schema().columns()[li], &right.schema().columns()[ri]);
        if lc.ty != rc.ty {
            return Err(ReconError::SchemaMismatch {
                left: vec![format!("{}: {}", lc.name, lc.ty)],
                right: vec![format!("{}: {}", rc.name, rc.ty)],
            });
        }
    }

    let carried: Vec<usize> = (0..right.schema().len())
        .filter(|i| !right_keys.indices().contains(i))
        .collect();

    let mut columns = left.schema().columns().to_vec();
    for &i in &carried {
        let col = &right.schema().columns()[i];
        if left.schema().index_of(&col.name).is_some() {
            return Err(ReconError::schema(&col.name, "joined column already exists on the left"));
        }
        columns.push(col.clone());
    }
    let schema = Arc::new(Schema::new(columns)?);

    let mut index: HashMap<CompositeKey, Vec<&Record>> = HashMap::new();
    for record in right.rows() {
        let key = right_keys.extract(record);
        if key.is_complete() {
            index.entry(key).or_default().push(record);
        }
    }

    let mut rows = Vec::with_capacity(left.len());
    for record in left.rows() {
        let key = left_keys.extract(record);
        let matches = if key.is_complete() { index.get(&key) } else { None };
        match matches {
            Some(found) => {
                for r in found {
                    let mut values = record.values().to_vec();
                    values.extend(carried.iter().map(|&i| r.values()[i].clone()));
                    rows.push(Record::from_parts(Arc::clone(&schema), values));
                }
            }
            None => {
                let mut values = record.values().to_vec();
                values.extend(carried.iter().map(|_| Value::Null));
                rows.push(Record::from_parts(Arc::clone(&schema), values));
            }
        }
    }

    Ok(Table::from_parts(schema, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    fn revenue() -> Table {
        let schema = Schema::from_pairs(&[
            ("movie_title", ValueType::Text),
            ("hero", ValueType::Text),
            ("release_year", ValueType::Number),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["Aladdin".into(), "Aladdin".into(), 1992i64.into()],
                vec!["Bambi".into(), "Bambi".into(), 1942i64.into()],
                vec!["Dumbo".into(), Value::Null, 1941i64.into()],
            ],
        )
        .unwrap()
    }

    fn actors() -> Table {
        let schema = Schema::from_pairs(&[
            ("hero", ValueType::Text),
            ("hero-actor", ValueType::Text),
            ("movie_title", ValueType::Text),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["Aladdin".into(), "Scott Weinger".into(), "Aladdin".into()],
                vec!["Aladdin".into(), "Brad Kane".into(), "Aladdin".into()],
                vec!["Dumbo".into(), "Edward Brophy".into(), "Dumbo".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn multiple_matches_fan_out_and_misses_get_nulls() {
        let out = left_join(&revenue(), &actors(), &["movie_title", "hero"]).unwrap();
        assert_eq!(
            out.schema().names(),
            vec!["movie_title", "hero", "release_year", "hero-actor"]
        );
        let actors: Vec<Value> = out.column("hero-actor").unwrap().cloned().collect();
        assert_eq!(
            actors,
            vec![
                Value::from("Scott Weinger"),
                Value::from("Brad Kane"),
                Value::Null,
                Value::Null,
            ]
        );
    }

    #[test]
    fn colliding_column_names_are_rejected() {
        let err = left_join(&revenue(), &revenue(), &["movie_title"]).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn key_type_mismatch_is_rejected() {
        let right = Table::new(
            Schema::from_pairs(&[("release_year", ValueType::Text)]).unwrap(),
            vec![],
        )
        .unwrap();
        assert!(matches!(
            left_join(&revenue(), &right, &["release_year"]),
            Err(ReconError::SchemaMismatch { .. })
        ));
    }
}
