//! `marquee run` and `marquee validate`: config-driven reconciliation jobs.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use marquee_recon::{ReconConfig, ReconError, ReconInput, ReconReport};

use crate::tables::{write_table, OutputFormat};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Run a job from a TOML config file
    #[command(after_help = "\
Output: with --json the full report (meta, summary, table) goes to stdout.
Otherwise the result table is printed as CSV unless the job writes a file.

Examples:
  marquee run rereleases.recon.toml
  marquee run rereleases.recon.toml --json
  marquee run heroes.recon.toml --output heroes.json")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output the JSON report to stdout instead of the CSV table
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a job config without running
    #[command(after_help = "\
Examples:
  marquee validate rereleases.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output } => cmd_run(config, json, output),
        ReconCommands::Validate { config } => cmd_validate(config),
    }
}

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::io(format!("cannot read config: {e}")))?;
    Ok(ReconConfig::from_toml(&config_str)?)
}

fn cmd_run(config_path: PathBuf, json_output: bool, output_file: Option<PathBuf>) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let input = ReconInput::from_csv(&config, |file| {
        let csv_path = base_dir.join(file);
        log::debug!("reading {}", csv_path.display());
        std::fs::read_to_string(&csv_path)
            .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", csv_path.display())))
    })?;

    let report = marquee_recon::run(&config, &input)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;

    let mut wrote_file = false;
    if let Some(ref path) = output_file {
        write_file(path, json_str.as_bytes())?;
        wrote_file = true;
    }
    if let Some(ref json) = config.output.json {
        write_file(&base_dir.join(json), json_str.as_bytes())?;
        wrote_file = true;
    }
    if let Some(ref csv) = config.output.csv {
        let mut buf = Vec::new();
        write_table(&report.table, OutputFormat::Csv, &mut buf)?;
        write_file(&base_dir.join(csv), &buf)?;
        wrote_file = true;
    }

    if json_output {
        println!("{json_str}");
    } else if !wrote_file {
        write_table(&report.table, OutputFormat::Csv, std::io::stdout().lock())?;
    }

    print_summary(&report);
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

/// Human summary to stderr
fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    eprintln!(
        "{} '{}': {} rows in, {} rows out ({} removed)",
        report.meta.kind, report.meta.config_name, s.input_rows, s.output_rows, s.removed_rows,
    );
    if let (Some(groups), Some(merged)) = (s.groups, s.merged_groups) {
        eprintln!("groups: {groups} ({merged} merged from duplicates)");
    }
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    eprintln!(
        "valid: {} job '{}' reading {} file(s)",
        config.kind,
        config.name,
        config.input_files().len(),
    );
    Ok(())
}
