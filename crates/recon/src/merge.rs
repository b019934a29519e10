use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{format_number, Record, Schema, Value, ValueType};

/// Delimiter placed between joined values of a `concat` column.
pub const CONCAT_DELIMITER: &str = "; ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeRule {
    /// Arithmetic sum across the group; null counts as 0.
    Sum,
    /// Group members' values joined with `"; "`, in group order. Null
    /// members are skipped; a group with no values stays null.
    Concat,
    /// The earliest record's value.
    #[default]
    KeepFirst,
}

impl fmt::Display for MergeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::Concat => write!(f, "concat"),
            Self::KeepFirst => write!(f, "keep-first"),
        }
    }
}

/// Per-column merge rules. Unlisted columns are `keep-first`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSpec {
    rules: Vec<(String, MergeRule)>,
}

impl MergeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rule for `column`, replacing any earlier rule for it.
    pub fn with(mut self, column: impl Into<String>, rule: MergeRule) -> Self {
        let column = column.into();
        match self.rules.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = rule,
            None => self.rules.push((column, rule)),
        }
        self
    }

    pub fn sum(self, column: impl Into<String>) -> Self {
        self.with(column, MergeRule::Sum)
    }

    pub fn concat(self, column: impl Into<String>) -> Self {
        self.with(column, MergeRule::Concat)
    }

    pub fn rule_for(&self, column: &str) -> MergeRule {
        self.rules
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, r)| *r)
            .unwrap_or_default()
    }

    pub fn rules(&self) -> &[(String, MergeRule)] {
        &self.rules
    }

    /// Resolve against `schema`: one rule per column, in schema order.
    pub(crate) fn resolve(
        &self,
        schema: &Schema,
        key_indices: &[usize],
    ) -> Result<Vec<MergeRule>, ReconError> {
        let mut resolved = vec![MergeRule::KeepFirst; schema.len()];
        for (column, rule) in &self.rules {
            let idx = schema.require(column, "merge column")?;
            if key_indices.contains(&idx) {
                return Err(ReconError::schema(column, "merge column is also a key column"));
            }
            let ty = schema.columns()[idx].ty;
            let expected = match rule {
                MergeRule::Sum => Some(ValueType::Number),
                MergeRule::Concat => Some(ValueType::Text),
                MergeRule::KeepFirst => None,
            };
            if let Some(expected) = expected {
                if ty != expected {
                    return Err(ReconError::ColumnType {
                        column: column.clone(),
                        expected: format!("{expected} column for '{rule}'"),
                        found: ty.to_string(),
                    });
                }
            }
            resolved[idx] = *rule;
        }
        Ok(resolved)
    }
}

impl<S: Into<String>> FromIterator<(S, MergeRule)> for MergeSpec {
    fn from_iter<I: IntoIterator<Item = (S, MergeRule)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(MergeSpec::new(), |spec, (c, r)| spec.with(c, r))
    }
}

/// Build the keeper's values for a group of two or more records.
/// `members[0]` is the keeper.
pub(crate) fn merge_values(members: &[&Record], rules: &[MergeRule]) -> Vec<Value> {
    let keeper = members[0].values();
    rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| match rule {
            MergeRule::KeepFirst => keeper[idx].clone(),
            MergeRule::Sum => Value::number(
                members
                    .iter()
                    .filter_map(|r| r.values()[idx].as_number())
                    .sum(),
            ),
            MergeRule::Concat => {
                let parts: Vec<String> = members
                    .iter()
                    .filter_map(|r| match &r.values()[idx] {
                        Value::Null => None,
                        Value::Text(s) => Some(s.clone()),
                        Value::Number(n) => Some(format_number(*n)),
                    })
                    .collect();
                if parts.is_empty() {
                    Value::Null
                } else {
                    Value::Text(parts.join(CONCAT_DELIMITER))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;

    fn schema() -> Schema {
        Schema::from_pairs(&[
            ("title", ValueType::Text),
            ("actor", ValueType::Text),
            ("gross", ValueType::Number),
        ])
        .unwrap()
    }

    #[test]
    fn unlisted_columns_keep_first() {
        let spec = MergeSpec::new().sum("gross");
        assert_eq!(spec.rule_for("gross"), MergeRule::Sum);
        assert_eq!(spec.rule_for("title"), MergeRule::KeepFirst);
    }

    #[test]
    fn later_rule_replaces_earlier() {
        let spec = MergeSpec::new().sum("gross").with("gross", MergeRule::KeepFirst);
        assert_eq!(spec.rules().len(), 1);
        assert_eq!(spec.rule_for("gross"), MergeRule::KeepFirst);
    }

    #[test]
    fn resolve_rejects_bad_columns() {
        let s = schema();
        let missing = MergeSpec::new().sum("budget").resolve(&s, &[0]).unwrap_err();
        assert!(matches!(missing, ReconError::Schema { .. }));

        let on_key = MergeSpec::new().concat("title").resolve(&s, &[0]).unwrap_err();
        assert!(on_key.to_string().contains("also a key column"));

        let sum_text = MergeSpec::new().sum("actor").resolve(&s, &[0]).unwrap_err();
        assert!(matches!(sum_text, ReconError::ColumnType { .. }));
    }

    #[test]
    fn merge_sums_and_concats_in_group_order() {
        let t = Table::new(
            schema(),
            vec![
                vec!["T".into(), "Sterling Holloway".into(), 1.0.into()],
                vec!["T".into(), Value::Null, Value::Null],
                vec!["T".into(), "Jim Cummings".into(), 2.5.into()],
                vec!["T".into(), "Sterling Holloway".into(), 0.5.into()],
            ],
        )
        .unwrap();
        let rules = MergeSpec::new()
            .concat("actor")
            .sum("gross")
            .resolve(t.schema(), &[0])
            .unwrap();
        let members: Vec<&Record> = t.rows().collect();
        let merged = merge_values(&members, &rules);
        assert_eq!(merged[0], Value::from("T"));
        assert_eq!(
            merged[1],
            Value::from("Sterling Holloway; Jim Cummings; Sterling Holloway")
        );
        assert_eq!(merged[2], Value::Number(4.0));
    }

    #[test]
    fn concat_skips_leading_null_member() {
        let t = Table::new(
            schema(),
            vec![
                vec!["T".into(), Value::Null, 1.0.into()],
                vec!["T".into(), "Pat Carroll".into(), 1.0.into()],
            ],
        )
        .unwrap();
        let rules = MergeSpec::new().concat("actor").resolve(t.schema(), &[0]).unwrap();
        let members: Vec<&Record> = t.rows().collect();
        assert_eq!(merge_values(&members, &rules)[1], Value::from("Pat Carroll"));
    }

    #[test]
    fn all_null_group_sums_to_zero() {
        let t = Table::new(
            schema(),
            vec![
                vec!["T".into(), Value::Null, Value::Null],
                vec!["T".into(), Value::Null, Value::Null],
            ],
        )
        .unwrap();
        let rules = MergeSpec::new()
            .concat("actor")
            .sum("gross")
            .resolve(t.schema(), &[0])
            .unwrap();
        let members: Vec<&Record> = t.rows().collect();
        let merged = merge_values(&members, &rules);
        assert_eq!(merged[1], Value::Null);
        assert_eq!(merged[2], Value::Number(0.0));
    }

    #[test]
    fn rules_deserialize_from_kebab_case() {
        #[derive(Deserialize)]
        struct Probe {
            rule: MergeRule,
        }
        let p: Probe = toml::from_str(r#"rule = "keep-first""#).unwrap();
        assert_eq!(p.rule, MergeRule::KeepFirst);
        assert!(toml::from_str::<Probe>(r#"rule = "average""#).is_err());
    }
}
