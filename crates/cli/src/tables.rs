//! One-shot table commands: `rereleases`, `actors`, `filter`.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use marquee_recon::{
    add_rereleases, filter_cross_table, filter_duplicates, load_csv_table, merge_character_actors, write_csv,
    Table,
};

use crate::CliError;

#[derive(Subcommand)]
pub enum TableCommands {
    /// Fold re-releases of a film into its original release, summing grosses
    #[command(after_help = "\
Examples:
  marquee rereleases movies.csv
  marquee rereleases movies.csv -f json
  marquee rereleases movies.csv -o first-releases.csv")]
    Rereleases {
        /// Movies CSV (movie_title, director, genre, MPAA_rating, release_year, grosses)
        input: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Attach hero or villain voice actors to revenue rows, one row per release
    #[command(after_help = "\
Examples:
  marquee actors voice-actors.csv revenue.csv --role hero
  marquee actors voice-actors.csv revenue.csv --role villain -f json")]
    Actors {
        /// Voice-actor CSV (character, voice-actor, movie_title)
        actors: PathBuf,

        /// Revenue CSV carrying a hero or villain column
        revenue: PathBuf,

        /// Which character column to match: hero or villain
        #[arg(long)]
        role: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Keep rows of the first table whose key never appears in the second
    #[command(after_help = "\
Without --key, rows are matched on movie_title, release_year, release_month.

Examples:
  marquee filter highest.csv lowest.csv
  marquee filter a.csv b.csv --key movie_title --key release_year")]
    Filter {
        /// Table to filter
        input: PathBuf,

        /// Table whose keys are removed from the input
        search: PathBuf,

        /// Key column. Repeatable.
        #[arg(long = "key", value_name = "COL")]
        keys: Vec<String>,

        #[command(flatten)]
        out: OutputArgs,
    },
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Output file (omit for stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

pub fn cmd_table(cmd: TableCommands) -> Result<(), CliError> {
    match cmd {
        TableCommands::Rereleases { input, out } => {
            let movies = read_table(&input)?;
            let table = add_rereleases(&movies)?;
            report_rows(movies.len(), &table);
            emit_table(&table, &out)
        }
        TableCommands::Actors { actors, revenue, role, out } => {
            let actors = read_table(&actors)?;
            let revenue = read_table(&revenue)?;
            let table = merge_character_actors(&actors, &revenue, &role)?;
            report_rows(revenue.len(), &table);
            emit_table(&table, &out)
        }
        TableCommands::Filter { input, search, keys, out } => {
            let table_a = read_table(&input)?;
            let table_b = read_table(&search)?;
            let table = if keys.is_empty() {
                filter_cross_table(&table_a, &table_b)?
            } else {
                filter_duplicates(&table_a, &table_b, keys.as_slice())?
            };
            report_rows(table_a.len(), &table);
            emit_table(&table, &out)
        }
    }
}

/// Read a CSV file with inferred column types.
pub(crate) fn read_table(path: &Path) -> Result<Table, CliError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    log::debug!("loaded {} ({} bytes)", path.display(), data.len());
    Ok(load_csv_table(&data, &HashMap::new())?)
}

/// Write `table` to `--output` or stdout in the chosen format.
pub(crate) fn emit_table(table: &Table, out: &OutputArgs) -> Result<(), CliError> {
    match out.output {
        Some(ref path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            write_table(table, out.format, file)?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        None => write_table(table, out.format, std::io::stdout().lock()),
    }
}

pub(crate) fn write_table<W: Write>(table: &Table, format: OutputFormat, mut writer: W) -> Result<(), CliError> {
    match format {
        OutputFormat::Csv => Ok(write_csv(table, writer)?),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, table)
                .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
            writeln!(writer).map_err(|e| CliError::io(e.to_string()))
        }
    }
}

fn report_rows(input_rows: usize, output: &Table) {
    eprintln!(
        "{} rows in, {} rows out ({} removed)",
        input_rows,
        output.len(),
        input_rows.saturating_sub(output.len()),
    );
}
