use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// A key, merge, sort, or join column is absent from a table's schema
    /// (or is otherwise unusable in that position).
    Schema { column: String, context: String },
    /// Two tables that must share a schema do not. Entries are `name: type`.
    SchemaMismatch { left: Vec<String>, right: Vec<String> },
    /// A row does not carry one value per schema column.
    RowArity { expected: usize, found: usize },
    /// Role argument outside `hero` / `villain`.
    InvalidRole(String),
    /// A designated key column holds null under a strict null-key policy.
    EmptyKey { column: String, row: usize },
    /// A value or merge rule does not fit the column's declared type.
    ColumnType { column: String, expected: String, found: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing input, empty key list, etc.).
    ConfigValidation(String),
    /// A cell could not be read as its column's type.
    ValueParse { column: String, row: usize, value: String },
    /// IO error (file read, CSV read/write, etc.).
    Io(String),
}

impl ReconError {
    pub(crate) fn schema(column: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            context: context.into(),
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema { column, context } => {
                write!(f, "schema error: {context}: column '{column}'")
            }
            Self::SchemaMismatch { left, right } => write!(
                f,
                "schema mismatch: [{}] vs [{}]",
                left.join(", "),
                right.join(", ")
            ),
            Self::RowArity { expected, found } => {
                write!(f, "row has {found} values, schema has {expected} columns")
            }
            Self::InvalidRole(role) => {
                write!(f, "invalid role '{role}': must be either hero or villain")
            }
            Self::EmptyKey { column, row } => {
                write!(f, "row {row}: key column '{column}' is null")
            }
            Self::ColumnType { column, expected, found } => {
                write!(f, "column '{column}': expected {expected}, found {found}")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::ValueParse { column, row, value } => {
                write!(f, "row {row}, column '{column}': cannot parse '{value}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Io(e.to_string())
    }
}
