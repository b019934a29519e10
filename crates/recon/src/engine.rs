use std::collections::HashMap;

use serde::Serialize;

use crate::antijoin::filter_duplicates;
use crate::config::{JobKind, ReconConfig};
use crate::error::ReconError;
use crate::group::{ReconcileStats, Reconciler};
use crate::load::load_csv_table;
use crate::model::Table;
use crate::recipes::{add_rereleases_with, merge_character_actors};

// ---------------------------------------------------------------------------
// Input + Output
// ---------------------------------------------------------------------------

/// Pre-loaded tables keyed by the file name used in the config.
#[derive(Debug, Default)]
pub struct ReconInput {
    pub tables: HashMap<String, Table>,
}

impl ReconInput {
    /// Parse each file's CSV text. `read` maps a config file name to its contents.
    pub fn from_csv<F>(config: &ReconConfig, mut read: F) -> Result<Self, ReconError>
    where
        F: FnMut(&str) -> Result<String, ReconError>,
    {
        let mut tables = HashMap::new();
        for file in config.input_files() {
            let data = read(file)?;
            tables.insert(file.to_string(), load_csv_table(&data, &config.types)?);
        }
        Ok(Self { tables })
    }

    fn table(&self, file: &str) -> Result<&Table, ReconError> {
        self.tables
            .get(file)
            .ok_or_else(|| ReconError::ConfigValidation(format!("no table loaded for '{file}'")))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReportMeta,
    pub summary: ReportSummary,
    pub table: Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    pub kind: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub input_rows: usize,
    pub output_rows: usize,
    pub removed_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_groups: Option<usize>,
}

impl ReportSummary {
    fn from_tables(input: &Table, output: &Table) -> Self {
        Self {
            input_rows: input.len(),
            output_rows: output.len(),
            removed_rows: input.len().saturating_sub(output.len()),
            groups: None,
            merged_groups: None,
        }
    }

    fn from_stats(stats: &ReconcileStats) -> Self {
        Self {
            input_rows: stats.input_rows,
            output_rows: stats.output_rows,
            removed_rows: stats.input_rows - stats.output_rows,
            groups: Some(stats.groups),
            merged_groups: Some(stats.merged_groups),
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run the job described by `config`. Returns the output table + summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    let primary = input.table(&config.input)?;

    let (table, summary) = match config.kind {
        JobKind::Reconcile => {
            let mut reconciler = Reconciler::new(config.key_columns.as_slice(), config.merge_spec())
                .null_keys(config.null_keys);
            if let Some(ref sort) = config.sort_columns {
                reconciler = reconciler.sort_by(sort.as_slice());
            }
            let (table, stats) = reconciler.run_with_stats(primary)?;
            (table, ReportSummary::from_stats(&stats))
        }
        JobKind::Rereleases => {
            let table = add_rereleases_with(primary, &config.rereleases)?;
            let summary = ReportSummary::from_tables(primary, &table);
            (table, summary)
        }
        JobKind::Filter => {
            let search = input.table(config.search.as_deref().unwrap_or_default())?;
            let table = filter_duplicates(primary, search, config.filter_key().as_slice())?;
            let summary = ReportSummary::from_tables(primary, &table);
            (table, summary)
        }
        JobKind::Actors => {
            let actors = input.table(config.actors.as_deref().unwrap_or_default())?;
            let role = config.parsed_role()?;
            let table = merge_character_actors(actors, primary, role.as_str())?;
            let summary = ReportSummary::from_tables(primary, &table);
            (table, summary)
        }
    };

    log::info!(
        "{} job '{}': {} rows in, {} rows out",
        config.kind,
        config.name,
        summary.input_rows,
        summary.output_rows
    );

    Ok(ReconReport {
        meta: ReportMeta {
            config_name: config.name.clone(),
            kind: config.kind.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    const MOVIES: &str = "\
movie_title,director,genre,MPAA_rating,release_year,total_gross,inflation_adjusted_gross
The Jungle Book,Jon Favreau,Adventure,PG,2016,\"$364,001,123\",\"$364,001,123\"
The Jungle Book,Wolfgang Reitherman,Adventure,G,1967,\"$141,843,000\",\"$578,632,000\"
The Jungle Book,Wolfgang Reitherman,Adventure,G,1990,\"$44,645,619\",\"$90,000,000\"
";

    fn load(config_toml: &str, files: &[(&str, &str)]) -> ReconReport {
        let config = ReconConfig::from_toml(config_toml).unwrap();
        let input = ReconInput::from_csv(&config, |name| {
            files
                .iter()
                .find(|(f, _)| *f == name)
                .map(|(_, data)| data.to_string())
                .ok_or_else(|| ReconError::Io(format!("missing {name}")))
        })
        .unwrap();
        run(&config, &input).unwrap()
    }

    #[test]
    fn reconcile_job_reports_stats() {
        let report = load(
            r#"
name = "Jungle"
kind = "reconcile"
input = "movies.csv"
key_columns = ["movie_title", "director", "genre", "MPAA_rating"]
sort_columns = ["release_year"]

[merge]
total_gross = "sum"
inflation_adjusted_gross = "sum"
"#,
            &[("movies.csv", MOVIES)],
        );
        assert_eq!(report.meta.kind, "reconcile");
        assert_eq!(
            report.summary,
            ReportSummary {
                input_rows: 3,
                output_rows: 2,
                removed_rows: 1,
                groups: Some(2),
                merged_groups: Some(1),
            }
        );
        let first = report.table.row(0).unwrap();
        assert_eq!(first.get("release_year"), Some(&Value::Number(1967.0)));
        assert_eq!(first.get("total_gross"), Some(&Value::Number(186_488_619.0)));
    }

    #[test]
    fn rereleases_job_uses_default_columns() {
        let report = load(
            r#"
name = "Jungle"
kind = "rereleases"
input = "movies.csv"
"#,
            &[("movies.csv", MOVIES)],
        );
        assert_eq!(report.summary.output_rows, 2);
        assert_eq!(report.summary.groups, None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["table"][0]["inflation_adjusted_gross"], 668_632_000.0);
    }

    #[test]
    fn filter_job_removes_shared_releases() {
        let releases = "\
movie_title,release_year,release_month
Bambi,1942,8
Dumbo,1941,10
";
        let other = "\
movie_title,release_year,release_month
Dumbo,1941,10
";
        let report = load(
            r#"
name = "Unique"
kind = "filter"
input = "a.csv"
search = "b.csv"
"#,
            &[("a.csv", releases), ("b.csv", other)],
        );
        assert_eq!(report.summary.removed_rows, 1);
        assert_eq!(report.table.row(0).unwrap().get("movie_title"), Some(&Value::from("Bambi")));
    }

    #[test]
    fn missing_table_is_reported() {
        let config = ReconConfig::from_toml(
            r#"
name = "Jungle"
kind = "rereleases"
input = "movies.csv"
"#,
        )
        .unwrap();
        let err = run(&config, &ReconInput::default()).unwrap_err();
        assert!(err.to_string().contains("no table loaded for 'movies.csv'"));
    }
}
