//! Warning types and the closed warning-code set.

use std::fmt;

/// Severity levels for parse/decode/update diagnostics.
///
/// Ordered so strict mode can compare against a configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// The closed warning code set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum WarningCode {
    LEADER_LEN_MISMATCH,
    BAD_BASE_ADDR,
    DIR_TRUNCATED,
    FIELD_BOUNDS,
    SUBFIELD_PARSE,
    LEADER_TRUNCATED,
    FIELD_LEN_MISMATCH,
    MISSING_FIELD_TERM,
    INVALID_SUBFIELD_DELIM,
    DANGLING_POINTER,
    COORD_COUNT_MISMATCH,
    EMPTY_REQUIRED_FIELD,
    INVALID_RUIN_CODE,
    UNKNOWN_OBJ_CODE,
    MISSING_REQUIRED_ATTR,
    DEGENERATE_EDGE,
    POLYGON_CLOSED_AUTO,
    SELF_INTERSECTION,
    UPDATE_GAP,
    UPDATE_RVER_MISMATCH,
    UPDATE_DELETE_MISSING,
    UPDATE_INSERT_CONFLICT,
    DEPTH_OUT_OF_RANGE,
    MAX_WARNINGS_EXCEEDED,
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single diagnostic produced while parsing, decoding, or updating.
///
/// Identity for deduplication is `(code, message)` — see
/// [`crate::diagnostics::collector::Collector::warn`].
#[derive(Debug, Clone)]
pub struct Warning {
    pub code: WarningCode,
    pub severity: Severity,
    pub message: String,
    pub record_id: Option<String>,
    pub feature_id: Option<String>,
    /// Seconds since UNIX_EPOCH, captured by the collector at insertion time.
    pub timestamp: u64,
}

impl Warning {
    pub fn new(code: WarningCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            record_id: None,
            feature_id: None,
            timestamp: 0,
        }
    }

    pub fn with_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_feature(mut self, feature_id: impl Into<String>) -> Self {
        self.feature_id = Some(feature_id.into());
        self
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.code, self.message, self.severity)?;
        if let Some(rid) = &self.record_id {
            write!(f, " record={rid}")?;
        }
        if let Some(fid) = &self.feature_id {
            write!(f, " feature={fid}")?;
        }
        Ok(())
    }
}
