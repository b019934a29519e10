// Marquee CLI - headless record reconciliation for box-office tables

mod exit_codes;
mod recon;
mod tables;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use marquee_recon::ReconError;

use exit_codes::{recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use recon::ReconCommands;
use tables::TableCommands;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Fold duplicate records in tabular data by composite key")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Recon(ReconCommands),

    #[command(flatten)]
    Table(TableCommands),
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("MARQUEE_COMMIT"), ")",
            "\nengine:  marquee-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("MARQUEE_TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("MARQUEE_COMMIT"), ")",
            "\nengine:  marquee-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("MARQUEE_TARGET"),
        )
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        None => Err(CliError::args("no command given").with_hint("run `marquee --help` for usage")),
        Some(Commands::Recon(cmd)) => recon::cmd_recon(cmd),
        Some(Commands::Table(cmd)) => tables::cmd_table(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::InvalidRole(_) => Some("use --role hero or --role villain".to_string()),
            ReconError::SchemaMismatch { .. } => {
                Some("both tables need the same columns, in order, with matching types".to_string())
            }
            ReconError::EmptyKey { .. } => {
                Some("set null_keys = \"singleton\" to keep rows with missing keys".to_string())
            }
            ReconError::ValueParse { .. } => {
                Some("force the column to text under [types] in the job config".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}
