use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{Record, Schema, Value};

/// One non-null component of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Text(String),
    Number(OrderedFloat<f64>),
}

/// Values of a record's key columns, in key-column order.
///
/// A key with any null part is incomplete. Incomplete keys are never
/// inserted into a grouping map or key set, so two nulls never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    parts: Vec<Option<KeyPart>>,
}

impl CompositeKey {
    pub fn parts(&self) -> &[Option<KeyPart>] {
        &self.parts
    }

    pub fn is_complete(&self) -> bool {
        self.parts.iter().all(Option::is_some)
    }

    /// Position of the first null part, if any.
    pub fn first_null(&self) -> Option<usize> {
        self.parts.iter().position(Option::is_none)
    }
}

/// What to do with a record whose key has a null part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKeyPolicy {
    /// The record forms its own group.
    #[default]
    Singleton,
    /// Fail with `EmptyKey`.
    Error,
}

/// Key column indices resolved once against a schema.
#[derive(Debug, Clone)]
pub struct KeyExtractor {
    columns: Vec<String>,
    indices: Vec<usize>,
}

impl KeyExtractor {
    pub fn new<S: AsRef<str>>(schema: &Schema, key_columns: &[S]) -> Result<Self, ReconError> {
        if key_columns.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one key column is required".into(),
            ));
        }
        let indices = key_columns
            .iter()
            .map(|c| schema.require(c.as_ref(), "key column"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            columns: key_columns.iter().map(|c| c.as_ref().to_string()).collect(),
            indices,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Record must belong to the schema this extractor was built for.
    pub fn extract(&self, record: &Record) -> CompositeKey {
        let values = record.values();
        CompositeKey {
            parts: self.indices.iter().map(|&i| key_part(&values[i])).collect(),
        }
    }

    /// Like `extract`, but a null key part is an `EmptyKey` error.
    pub fn extract_complete(&self, record: &Record, row: usize) -> Result<CompositeKey, ReconError> {
        let key = self.extract(record);
        match key.first_null() {
            Some(pos) => Err(ReconError::EmptyKey {
                column: self.columns[pos].clone(),
                row,
            }),
            None => Ok(key),
        }
    }
}

fn key_part(value: &Value) -> Option<KeyPart> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(KeyPart::Text(s.clone())),
        Value::Number(n) => Some(KeyPart::Number(OrderedFloat(*n))),
    }
}

/// Composite key of a single record.
pub fn derive_key<S: AsRef<str>>(record: &Record, key_columns: &[S]) -> Result<CompositeKey, ReconError> {
    Ok(KeyExtractor::new(record.schema(), key_columns)?.extract(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Table, ValueType};

    fn table() -> Table {
        let schema = Schema::from_pairs(&[
            ("title", ValueType::Text),
            ("year", ValueType::Number),
            ("gross", ValueType::Number),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["Dumbo".into(), 1941i64.into(), 1.5.into()],
                vec!["Dumbo".into(), 1941i64.into(), 2.0.into()],
                vec!["Dumbo".into(), Value::Null, 2.0.into()],
                vec!["Dumbo".into(), Value::Null, 3.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn equal_values_give_equal_keys() {
        let t = table();
        let k0 = derive_key(t.row(0).unwrap(), &["title", "year"]).unwrap();
        let k1 = derive_key(t.row(1).unwrap(), &["title", "year"]).unwrap();
        assert_eq!(k0, k1);
        assert!(k0.is_complete());
    }

    #[test]
    fn null_part_makes_key_incomplete() {
        let t = table();
        let k = derive_key(t.row(2).unwrap(), &["title", "year"]).unwrap();
        assert!(!k.is_complete());
        assert_eq!(k.first_null(), Some(1));
    }

    #[test]
    fn missing_key_column_is_schema_error() {
        let t = table();
        let err = derive_key(t.row(0).unwrap(), &["title", "director"]).unwrap_err();
        assert!(matches!(err, ReconError::Schema { ref column, .. } if column == "director"));
    }

    #[test]
    fn extract_complete_reports_null_column() {
        let t = table();
        let ex = KeyExtractor::new(t.schema(), &["title", "year"]).unwrap();
        assert!(ex.extract_complete(t.row(0).unwrap(), 0).is_ok());
        assert_eq!(
            ex.extract_complete(t.row(3).unwrap(), 3).unwrap_err(),
            ReconError::EmptyKey { column: "year".into(), row: 3 }
        );
    }

    #[test]
    fn empty_key_column_list_rejected() {
        let t = table();
        let empty: [&str; 0] = [];
        assert!(KeyExtractor::new(t.schema(), &empty).is_err());
    }
}
