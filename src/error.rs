//! Fatal error taxonomy: validation, update, and resource exhaustion
//! failures that abort a parse session outright. Everything recoverable
//! stays a [`crate::diagnostics::Warning`] instead.

use thiserror::Error;

use crate::diagnostics::Warning;

/// Errors that terminate a parse or update session.
///
/// Every variant is paired with the warnings accumulated up to the point
/// of failure by the caller (see [`crate::session::ParseSession`]); the
/// error itself carries only what's needed to explain *why* it stopped.
#[derive(Debug, Error)]
pub enum OpenEncError {
    /// The input bytes are too short to contain a leader.
    #[error("input too short: {len} bytes, need at least 24 for a leader")]
    TooShort { len: usize },

    /// The DDR (first record) failed a leader/directory precondition.
    #[error("invalid DDR: {reason}")]
    InvalidDdr { reason: String },

    /// An update filename sequence has a gap.
    #[error("update sequence gap: expected {expected}, found {found}")]
    UpdateGap { expected: u32, found: u32 },

    /// An update's DSID cell name doesn't match the base cell.
    #[error("update cell name mismatch: base is {base}, update {file} names {found}")]
    CellNameMismatch {
        base: String,
        file: String,
        found: String,
    },

    /// Strict mode promoted a warning (or a budget overflow) to fatal.
    #[error("strict mode: {trigger}")]
    StrictFailure {
        trigger: Warning,
        warnings: Vec<Warning>,
    },

    /// The warning budget was exhausted even though strict mode wasn't
    /// armed.
    #[error("warning budget exhausted after {} warnings", warnings.len())]
    ResourceExhausted { warnings: Vec<Warning> },
}
