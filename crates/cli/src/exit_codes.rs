//! CLI Exit Code Registry
//!
//! Single source of truth for `smerge` exit codes. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3-9     | config           | Merge / reconcile configuration          |
//! | 10-19   | input            | Reading layers, references, DEMs         |
//! | 20-29   | output           | Writing CSV / JSON results               |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use sotamerge_io::IoError;
use sotamerge_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Config (3-9)
// =============================================================================

/// Config file is not valid TOML, has unknown keys, or fails validation.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// A layer name maps to no DEM tag, several tags, or a tag already taken.
pub const EXIT_CONFIG_SOURCE: u8 = 4;

/// Config names no usable input.
pub const EXIT_CONFIG_MISSING_INPUT: u8 = 5;

// =============================================================================
// Input (10-19)
// =============================================================================

/// Input file missing or unreadable.
pub const EXIT_INPUT_READ: u8 = 10;

/// Input file readable but malformed (CSV, Landserf list, ASCII grid).
pub const EXIT_INPUT_PARSE: u8 = 11;

/// Required column absent from an input table.
pub const EXIT_INPUT_COLUMN: u8 = 12;

/// Geometry text that cannot be parsed where a position is required.
pub const EXIT_INPUT_GEOMETRY: u8 = 13;

// =============================================================================
// Output (20-29)
// =============================================================================

/// Cannot write a CSV or JSON result.
pub const EXIT_OUTPUT_WRITE: u8 = 20;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        ReconError::UnknownSource { .. }
        | ReconError::AmbiguousSource { .. }
        | ReconError::DuplicateSource { .. } => EXIT_CONFIG_SOURCE,
        ReconError::MissingInput(_) => EXIT_CONFIG_MISSING_INPUT,
    }
}

/// Map a read-side IO error to its exit code.
pub fn input_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Io(_) => EXIT_INPUT_READ,
        IoError::Csv(_) | IoError::Landserf { .. } | IoError::Grid(_) | IoError::Json(_) => EXIT_INPUT_PARSE,
        IoError::MissingColumn { .. } => EXIT_INPUT_COLUMN,
        IoError::Geometry { .. } => EXIT_INPUT_GEOMETRY,
    }
}
