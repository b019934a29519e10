use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Text,
    Number,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
        }
    }
}

/// A single nullable cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    /// Numeric value; NaN becomes `Null`.
    pub fn number(n: f64) -> Self {
        if n.is_nan() {
            Self::Null
        } else {
            Self::Number(n)
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Type of a non-null value.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(ValueType::Text),
            Self::Number(_) => Some(ValueType::Number),
        }
    }

    /// Ascending sort order: numbers, then text, then nulls.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ValueType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Fixed, ordered list of typed columns. Column names are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Result<Self, ReconError> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(ReconError::schema(&col.name, "duplicate column name"));
            }
        }
        Ok(Self { columns })
    }

    pub fn from_pairs(pairs: &[(&str, ValueType)]) -> Result<Self, ReconError> {
        Self::new(pairs.iter().map(|(n, t)| Column::new(*n, *t)).collect())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `name: type` for each column, for error messages.
    pub fn describe(&self) -> Vec<String> {
        self.columns.iter().map(|c| format!("{}: {}", c.name, c.ty)).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of `name`, or a `Schema` error naming `context`.
    pub fn require(&self, name: &str, context: &str) -> Result<usize, ReconError> {
        self.index_of(name)
            .ok_or_else(|| ReconError::schema(name, format!("{context} not in schema")))
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One immutable row. Holds exactly one value per schema column.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl Record {
    /// Validates arity and column types. A NaN number is stored as null.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self, ReconError> {
        if values.len() != schema.len() {
            return Err(ReconError::RowArity {
                expected: schema.len(),
                found: values.len(),
            });
        }
        let values: Vec<Value> = values
            .into_iter()
            .map(|v| match v {
                Value::Number(n) => Value::number(n),
                other => other,
            })
            .collect();
        for (col, value) in schema.columns().iter().zip(&values) {
            if let Some(found) = value.value_type() {
                if found != col.ty {
                    return Err(ReconError::ColumnType {
                        column: col.name.clone(),
                        expected: col.ty.to_string(),
                        found: found.to_string(),
                    });
                }
            }
        }
        Ok(Self { schema, values })
    }

    /// Caller guarantees arity and types already match `schema`.
    pub(crate) fn from_parts(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    pub fn get_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (col, value) in self.schema.columns().iter().zip(&self.values) {
            map.serialize_entry(&col.name, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Ordered rows sharing one schema. Every operation returns a new table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<Schema>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self, ReconError> {
        let schema = Arc::new(schema);
        let rows = rows
            .into_iter()
            .map(|values| Record::new(Arc::clone(&schema), values))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { schema, rows })
    }

    pub fn empty(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            rows: Vec::new(),
        }
    }

    /// Build from records that must all carry `schema`.
    pub fn from_records(schema: Arc<Schema>, rows: Vec<Record>) -> Result<Self, ReconError> {
        for row in &rows {
            if row.schema != schema {
                return Err(ReconError::SchemaMismatch {
                    left: schema.describe(),
                    right: row.schema.describe(),
                });
            }
        }
        Ok(Self { schema, rows })
    }

    pub(crate) fn from_parts(schema: Arc<Schema>, rows: Vec<Record>) -> Self {
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn schema_arc(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    /// True when column `idx` holds no non-null value (including no rows).
    pub fn is_null_column(&self, idx: usize) -> bool {
        self.rows.iter().all(|r| r.values.get(idx).map_or(true, Value::is_null))
    }

    pub fn row(&self, idx: usize) -> Option<&Record> {
        self.rows.get(idx)
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_, ReconError> {
        let idx = self.schema.require(name, "column")?;
        Ok(self.rows.iter().map(move |r| &r.values[idx]))
    }

    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, ReconError> {
        let indices = names
            .iter()
            .map(|n| self.schema.require(n.as_ref(), "selected column"))
            .collect::<Result<Vec<_>, _>>()?;
        let schema = Arc::new(Schema::new(
            indices.iter().map(|&i| self.schema.columns[i].clone()).collect(),
        )?);
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let values = indices.iter().map(|&i| r.values[i].clone()).collect();
                Record::from_parts(Arc::clone(&schema), values)
            })
            .collect();
        Ok(Table { schema, rows })
    }

    /// Rename columns `(from, to)`; types and values are unchanged.
    pub fn rename(&self, renames: &[(&str, &str)]) -> Result<Table, ReconError> {
        let mut columns = self.schema.columns.clone();
        for (from, to) in renames {
            let idx = self.schema.require(from, "renamed column")?;
            columns[idx].name = (*to).to_string();
        }
        let schema = Arc::new(Schema::new(columns)?);
        Ok(self.with_schema(schema))
    }

    /// Append a computed column.
    pub fn with_column<F>(&self, name: &str, ty: ValueType, f: F) -> Result<Table, ReconError>
    where
        F: Fn(&Record) -> Value,
    {
        let mut columns = self.schema.columns.clone();
        columns.push(Column::new(name, ty));
        let schema = Arc::new(Schema::new(columns)?);
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut values = r.values.clone();
                values.push(f(r));
                Record::new(Arc::clone(&schema), values)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table { schema, rows })
    }

    /// Stable ascending sort by `columns`; ties keep their current order.
    pub fn sort_by<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table, ReconError> {
        let indices = columns
            .iter()
            .map(|c| self.schema.require(c.as_ref(), "sort column"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            indices
                .iter()
                .map(|&i| a.values[i].sort_cmp(&b.values[i]))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Ok(Table {
            schema: Arc::clone(&self.schema),
            rows,
        })
    }

    pub fn head(&self, n: usize) -> Table {
        self.filter_indexed(|i, _| i < n)
    }

    pub fn tail(&self, n: usize) -> Table {
        let start = self.rows.len().saturating_sub(n);
        self.filter_indexed(|i, _| i >= start)
    }

    pub fn filter<F>(&self, mut pred: F) -> Table
    where
        F: FnMut(&Record) -> bool,
    {
        self.filter_indexed(|_, r| pred(r))
    }

    fn filter_indexed<F>(&self, mut pred: F) -> Table
    where
        F: FnMut(usize, &Record) -> bool,
    {
        Table {
            schema: Arc::clone(&self.schema),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, r)| pred(*i, r))
                .map(|(_, r)| r.clone())
                .collect(),
        }
    }

    fn with_schema(&self, schema: Arc<Schema>) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|r| Record::from_parts(Arc::clone(&schema), r.values.clone()))
            .collect();
        Table { schema, rows }
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}
