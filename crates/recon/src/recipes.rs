//! Concrete reconciliations for film release and voice-cast tables, each a
//! thin configuration of the generic reconciler, join, and anti-join.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::antijoin::filter_duplicates;
use crate::error::ReconError;
use crate::group::Reconciler;
use crate::join::left_join;
use crate::key::{CompositeKey, KeyExtractor};
use crate::merge::{MergeRule, MergeSpec};
use crate::model::{Column, Schema, Table, Value, ValueType};

pub const MOVIE_TITLE: &str = "movie_title";
pub const RELEASE_MONTH: &str = "release_month";
pub const RELEASE_YEAR: &str = "release_year";

/// Identity of one theatrical release.
pub const RELEASE_KEY: [&str; 3] = [MOVIE_TITLE, RELEASE_YEAR, RELEASE_MONTH];

// ---------------------------------------------------------------------------
// Re-releases
// ---------------------------------------------------------------------------

/// Column names used by [`add_rereleases_with`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RereleaseColumns {
    /// Columns that identify one production across its re-releases.
    pub identity: Vec<String>,
    /// Revenue columns summed into the original release.
    pub sums: Vec<String>,
    pub sort: Vec<String>,
}

impl Default for RereleaseColumns {
    fn default() -> Self {
        Self {
            identity: vec![
                MOVIE_TITLE.into(),
                "director".into(),
                "genre".into(),
                "MPAA_rating".into(),
            ],
            sums: vec!["total_gross".into(), "inflation_adjusted_gross".into()],
            sort: vec![RELEASE_YEAR.into(), MOVIE_TITLE.into()],
        }
    }
}

/// Fold re-released films into their first release, summing revenue.
pub fn add_rereleases(table: &Table) -> Result<Table, ReconError> {
    add_rereleases_with(table, &RereleaseColumns::default())
}

pub fn add_rereleases_with(table: &Table, columns: &RereleaseColumns) -> Result<Table, ReconError> {
    let spec: MergeSpec = columns.sums.iter().map(|c| (c.as_str(), MergeRule::Sum)).collect();
    Reconciler::new(columns.identity.as_slice(), spec)
        .sort_by(columns.sort.as_slice())
        .run(table)
}

// ---------------------------------------------------------------------------
// Character actors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Hero,
    Villain,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Villain => "villain",
        }
    }

    /// Column holding the voice actor(s) for this role after a merge.
    pub fn actor_column(&self) -> String {
        format!("{}-actor", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hero" => Ok(Self::Hero),
            "villain" => Ok(Self::Villain),
            other => Err(ReconError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attach voice actors for `role` to each release, one row per release.
///
/// `actors` needs `character`, `voice-actor`, and `movie_title`; `revenue`
/// needs `movie_title`, the role column, `release_month`, and `release_year`.
/// Several actors voicing the same character are joined with `"; "`.
pub fn merge_character_actors(actors: &Table, revenue: &Table, role: &str) -> Result<Table, ReconError> {
    let role: Role = role.parse()?;
    let actor_column = role.actor_column();

    let actors = actors.rename(&[("character", role.as_str()), ("voice-actor", actor_column.as_str())])?;
    let joined = left_join(revenue, &actors, &[MOVIE_TITLE, role.as_str()])?;

    Reconciler::new(&[MOVIE_TITLE, RELEASE_MONTH, RELEASE_YEAR], MergeSpec::new().concat(actor_column))
        .run(&joined)
}

// ---------------------------------------------------------------------------
// Cross-table filter
// ---------------------------------------------------------------------------

/// Releases of `table_a` that do not appear in `table_b`.
pub fn filter_cross_table(table_a: &Table, table_b: &Table) -> Result<Table, ReconError> {
    filter_duplicates(table_a, table_b, &RELEASE_KEY)
}

// ---------------------------------------------------------------------------
// Derived columns and summaries
// ---------------------------------------------------------------------------

pub fn release_decade(year: i64) -> i64 {
    year.div_euclid(10) * 10
}

/// Append `decade_column` computed from the numeric `year_column`.
pub fn with_release_decade(table: &Table, year_column: &str, decade_column: &str) -> Result<Table, ReconError> {
    let idx = table.schema().require(year_column, "year column")?;
    if table.schema().columns()[idx].ty != ValueType::Number {
        return Err(ReconError::ColumnType {
            column: year_column.into(),
            expected: ValueType::Number.to_string(),
            found: ValueType::Text.to_string(),
        });
    }
    table.with_column(decade_column, ValueType::Number, |r| match r.get_at(idx) {
        Some(Value::Number(y)) => Value::Number(release_decade(y.floor() as i64) as f64),
        _ => Value::Null,
    })
}

/// Number of films per value of `feature`, most frequent first.
///
/// Rows with a null `feature` or null `movie_title` are not counted; equal
/// counts keep the order in which their value first appeared.
pub fn rank_by_count(table: &Table, feature: &str) -> Result<Table, ReconError> {
    let feature_idx = table.schema().require(feature, "ranked column")?;
    let title_idx = table.schema().require(MOVIE_TITLE, "title column")?;
    let extractor = KeyExtractor::new(table.schema(), &[feature])?;

    let mut positions: HashMap<CompositeKey, usize> = HashMap::new();
    let mut counts: Vec<(Value, usize)> = Vec::new();
    for record in table.rows() {
        let key = extractor.extract(record);
        if !key.is_complete() {
            continue;
        }
        let counted = usize::from(!record.values()[title_idx].is_null());
        match positions.get(&key) {
            Some(&pos) => counts[pos].1 += counted,
            None => {
                positions.insert(key, counts.len());
                counts.push((record.values()[feature_idx].clone(), counted));
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let schema = Schema::new(vec![
        table.schema().columns()[feature_idx].clone(),
        Column::new("number_of_films", ValueType::Number),
    ])?;
    Table::new(
        schema,
        counts
            .into_iter()
            .map(|(value, n)| vec![value, Value::Number(n as f64)])
            .collect(),
    )
}

/// Lowest and highest `count` rows by `feature`.
///
/// Rows with a null `feature` are dropped first. When fewer than `count`
/// rows remain, half of them go to each side. Highest rows whose key also
/// appears among the lowest rows are removed.
pub fn split_extremes<S: AsRef<str>>(
    table: &Table,
    feature: &str,
    count: usize,
    key_columns: &[S],
) -> Result<(Table, Table), ReconError> {
    if table.len() < count {
        return Err(ReconError::ConfigValidation(format!(
            "record count {count} exceeds the {} available rows",
            table.len()
        )));
    }
    let idx = table.schema().require(feature, "feature column")?;
    let ranked = table
        .filter(|r| !r.values()[idx].is_null())
        .sort_by(&[feature])?;

    let take = if ranked.len() < count { ranked.len() / 2 } else { count };
    let lowest = ranked.head(take);
    let highest = filter_duplicates(&ranked.tail(take), &lowest, key_columns)?;
    Ok((lowest, highest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn revenue() -> Table {
        let schema = Schema::from_pairs(&[
            ("movie_title", ValueType::Text),
            ("hero", ValueType::Text),
            ("release_month", ValueType::Number),
            ("release_year", ValueType::Number),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["Aladdin".into(), "Aladdin".into(), 11i64.into(), 1992i64.into()],
                vec!["Peter Pan".into(), "Peter Pan".into(), 2i64.into(), 1953i64.into()],
                vec!["Dumbo".into(), "Dumbo".into(), 10i64.into(), 1941i64.into()],
            ],
        )
        .unwrap()
    }

    fn voice_actors() -> Table {
        let schema = Schema::from_pairs(&[
            ("character", ValueType::Text),
            ("voice-actor", ValueType::Text),
            ("movie_title", ValueType::Text),
        ])
        .unwrap();
        Table::new(
            schema,
            vec![
                vec!["Aladdin".into(), "Scott Weinger".into(), "Aladdin".into()],
                vec!["Aladdin".into(), "Brad Kane".into(), "Aladdin".into()],
                vec!["Peter Pan".into(), "Bobby Driscoll".into(), "Peter Pan".into()],
                vec!["Jafar".into(), "Jonathan Freeman".into(), "Aladdin".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn role_parsing() {
        assert_eq!("hero".parse::<Role>().unwrap(), Role::Hero);
        assert_eq!(Role::Villain.actor_column(), "villain-actor");
        assert_eq!(
            "sidekick".parse::<Role>().unwrap_err(),
            ReconError::InvalidRole("sidekick".into())
        );
    }

    #[test]
    fn invalid_role_fails_before_any_work() {
        let err = merge_character_actors(&voice_actors(), &revenue(), "sidekick").unwrap_err();
        assert!(matches!(err, ReconError::InvalidRole(_)));
    }

    #[test]
    fn hero_actors_are_concatenated_per_release() {
        let out = merge_character_actors(&voice_actors(), &revenue(), "hero").unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(
            out.schema().names(),
            vec!["movie_title", "hero", "release_month", "release_year", "hero-actor"]
        );
        let actors: Vec<Value> = out.column("hero-actor").unwrap().cloned().collect();
        assert_eq!(
            actors,
            vec![
                Value::from("Scott Weinger; Brad Kane"),
                Value::from("Bobby Driscoll"),
                Value::Null,
            ]
        );
    }

    #[test]
    fn decade_floors_year() {
        assert_eq!(release_decade(1967), 1960);
        assert_eq!(release_decade(2010), 2010);
        assert_eq!(release_decade(1999), 1990);
    }

    #[test]
    fn decade_column_is_appended() {
        let out = with_release_decade(&revenue(), RELEASE_YEAR, "release_decade").unwrap();
        let decades: Vec<Value> = out.column("release_decade").unwrap().cloned().collect();
        assert_eq!(
            decades,
            vec![Value::Number(1990.0), Value::Number(1950.0), Value::Number(1940.0)]
        );
        assert!(with_release_decade(&revenue(), "hero", "d").is_err());
    }

    #[test]
    fn rank_counts_descending() {
        let schema = Schema::from_pairs(&[
            ("movie_title", ValueType::Text),
            ("genre", ValueType::Text),
        ])
        .unwrap();
        let t = Table::new(
            schema,
            vec![
                vec!["A".into(), "Drama".into()],
                vec!["B".into(), "Comedy".into()],
                vec!["C".into(), "Comedy".into()],
                vec!["D".into(), Value::Null],
                vec!["E".into(), "Musical".into()],
            ],
        )
        .unwrap();
        let ranked = rank_by_count(&t, "genre").unwrap();
        let genres: Vec<String> = ranked.column("genre").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(genres, vec!["Comedy", "Drama", "Musical"]);
        assert_eq!(ranked.row(0).unwrap().get("number_of_films"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn extremes_do_not_overlap() {
        let schema = Schema::from_pairs(&[
            ("movie_title", ValueType::Text),
            ("release_year", ValueType::Number),
            ("release_month", ValueType::Number),
            ("total_gross", ValueType::Number),
        ])
        .unwrap();
        let t = Table::new(
            schema,
            vec![
                vec!["A".into(), 1990i64.into(), 1i64.into(), 30.0.into()],
                vec!["B".into(), 1991i64.into(), 2i64.into(), 10.0.into()],
                vec!["C".into(), 1992i64.into(), 3i64.into(), 20.0.into()],
                vec!["D".into(), 1993i64.into(), 4i64.into(), Value::Null],
            ],
        )
        .unwrap();

        let (low, high) = split_extremes(&t, "total_gross", 2, &RELEASE_KEY).unwrap();
        let low_titles: Vec<String> = low.column("movie_title").unwrap().map(|v| v.to_string()).collect();
        let high_titles: Vec<String> = high.column("movie_title").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(low_titles, vec!["B", "C"]);
        // C is in both halves, so it only stays on the low side
        assert_eq!(high_titles, vec!["A"]);

        assert!(split_extremes(&t, "total_gross", 10, &RELEASE_KEY).is_err());
    }
}
