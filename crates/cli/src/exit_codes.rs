//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `crecon` exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | Usage error (bad args, bad config, invalid page request) |
//! | 3    | Schema rejection (required columns missing)              |
//! | 4    | Rows rejected and `--strict` was given                   |
//! | 5    | I/O error (unreadable input, unwritable output)          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` construction

use claims_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid config, malformed page request.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Ingest (3-5)
// =============================================================================

/// One or both CSV files lack required columns. Nothing was reconciled.
pub const EXIT_SCHEMA: u8 = 3;

/// The batch reconciled, but some rows were excluded and `--strict` was set.
pub const EXIT_ROWS_REJECTED: u8 = 4;

/// Cannot read an input file or write an output file.
pub const EXIT_IO: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Schema(_) | ReconError::Csv { .. } => EXIT_SCHEMA,
        ReconError::InvalidPage(_) | ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
            EXIT_USAGE
        }
        ReconError::PatientDirectory(_) | ReconError::Io(_) => EXIT_IO,
        ReconError::Task(_) => EXIT_ERROR,
    }
}
