//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `xref` exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Description                                       |
//! |------|---------------------------------------------------|
//! | 0    | Success (per-entity failures are reported in JSON)|
//! | 1    | General error (unspecified)                       |
//! | 2    | CLI usage error (bad args)                        |
//! | 3    | I/O error (cannot read or write a file)           |
//! | 4    | Records or observations could not be parsed       |
//! | 6    | Engine config invalid or unparseable              |
//!
//! Code 5 is reserved.

use crossref_recon::ReconError;

/// Success - command completed. Individual entities may still have failed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// A file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Records or observations file is not valid input.
pub const EXIT_INPUT_PARSE: u8 = 4;

/// Engine config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// Map an engine error surfacing at the CLI boundary to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::InputParse(_) | ReconError::InvalidObservation { .. } => EXIT_INPUT_PARSE,
        ReconError::EntityNotFound(_)
        | ReconError::SourceUnavailable { .. }
        | ReconError::Comparison { .. }
        | ReconError::Internal(_) => EXIT_ERROR,
    }
}
