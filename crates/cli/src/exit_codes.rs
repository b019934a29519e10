//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Description                                           |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | General error (unspecified)                           |
//! | 2    | CLI usage error (bad args)                            |
//! | 3    | Table shape error (missing column, mismatch, role)    |
//! | 4    | Job config could not be parsed or is invalid          |
//! | 5    | I/O error (unreadable file, bad cell, write failure)  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in [`recon_exit_code`] if an engine error produces it

use marquee_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Missing or unusable column, schema mismatch, null key, invalid role.
pub const EXIT_SCHEMA: u8 = 3;

/// Job config parse or validation failure.
pub const EXIT_CONFIG: u8 = 4;

/// File read/write failure or a cell that cannot be parsed.
pub const EXIT_IO: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Schema { .. }
        | ReconError::SchemaMismatch { .. }
        | ReconError::RowArity { .. }
        | ReconError::InvalidRole(_)
        | ReconError::EmptyKey { .. }
        | ReconError::ColumnType { .. } => EXIT_SCHEMA,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::ValueParse { .. } | ReconError::Io(_) => EXIT_IO,
    }
}
