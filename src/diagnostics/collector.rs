//! The diagnostics collector: dedup, per-severity counters, strict-mode
//! promotion, and the logger hook contract.

use std::collections::HashSet;
use std::path::Path;

use crate::diagnostics::warning::{Severity, Warning, WarningCode};
use crate::error::OpenEncError;

/// Hooks driven for every warning, and at the start/end of a file parse.
///
/// The default is [`SilentLogger`] — nothing is printed unless the caller
/// composes their own, per the Design Notes ("replace global print-based
/// warning sinks with the logger interface; default is silent").
pub trait Logger {
    fn on_start_file(&mut self, _path: &str) {}
    fn on_warning(&mut self, _warning: &Warning) {}
    fn on_finish_file(&mut self, _path: &str, _warnings: &[Warning]) {}
}

/// A logger that does nothing — the collector's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentLogger;

impl Logger for SilentLogger {}

/// A logger that forwards to the `log` facade at levels matching severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn on_start_file(&mut self, path: &str) {
        log::info!("starting parse of {path}");
    }

    fn on_warning(&mut self, warning: &Warning) {
        match warning.severity {
            Severity::Info => log::debug!("{warning}"),
            Severity::Warning => log::warn!("{warning}"),
            Severity::Error => log::error!("{warning}"),
        }
    }

    fn on_finish_file(&mut self, path: &str, warnings: &[Warning]) {
        log::info!("finished parse of {path}: {} warnings", warnings.len());
    }
}

/// Accumulates, deduplicates and (in strict mode) escalates warnings.
pub struct Collector {
    warnings: Vec<Warning>,
    seen: HashSet<(WarningCode, String)>,
    info_count: usize,
    warning_count: usize,
    error_count: usize,
    strict: bool,
    max_warnings: usize,
    logger: Box<dyn Logger>,
}

impl Collector {
    /// A non-strict collector with an effectively unbounded warning budget.
    pub fn new() -> Self {
        Self::with_logger(Box::new(SilentLogger))
    }

    pub fn with_logger(logger: Box<dyn Logger>) -> Self {
        Self {
            warnings: Vec::new(),
            seen: HashSet::new(),
            info_count: 0,
            warning_count: 0,
            error_count: 0,
            strict: false,
            max_warnings: 1000,
            logger,
        }
    }

    /// Arm strict mode: any `error`-severity warning, or exceeding
    /// `max_warnings` total, becomes a terminal [`OpenEncError::StrictFailure`].
    pub fn set_strict(&mut self, strict: bool, max_warnings: usize) {
        self.strict = strict;
        self.max_warnings = max_warnings;
    }

    pub fn on_start_file(&mut self, path: &str) {
        self.logger.on_start_file(path);
    }

    pub fn on_finish_file(&mut self, path: &str) {
        self.logger.on_finish_file(path, &self.warnings);
    }

    /// Record a warning. Returns `Err` only when strict mode is armed and
    /// the warning is fatal (error severity, or it would overflow the
    /// warning budget).
    pub fn warn(
        &mut self,
        code: WarningCode,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<(), OpenEncError> {
        self.warn_ctx(code, severity, message, None, None)
    }

    pub fn warn_ctx(
        &mut self,
        code: WarningCode,
        severity: Severity,
        message: impl Into<String>,
        record_id: Option<String>,
        feature_id: Option<String>,
    ) -> Result<(), OpenEncError> {
        let message = message.into();
        let key = (code, message.clone());
        if self.seen.contains(&key) {
            return Ok(());
        }
        self.seen.insert(key);

        let mut warning = Warning::new(code, severity, message);
        if let Some(rid) = record_id {
            warning = warning.with_record(rid);
        }
        if let Some(fid) = feature_id {
            warning = warning.with_feature(fid);
        }

        match severity {
            Severity::Info => self.info_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Error => self.error_count += 1,
        }

        self.logger.on_warning(&warning);

        let overflow = self.warnings.len() + 1 > self.max_warnings;
        if overflow {
            let budget_warning = Warning::new(
                WarningCode::MAX_WARNINGS_EXCEEDED,
                Severity::Error,
                format!("warning budget of {} exceeded", self.max_warnings),
            );
            self.warnings.push(warning);
            if self.strict {
                return Err(OpenEncError::StrictFailure {
                    trigger: budget_warning,
                    warnings: self.warnings.clone(),
                });
            }
            self.warnings.push(budget_warning);
            return Ok(());
        }

        self.warnings.push(warning.clone());

        if self.strict && severity == Severity::Error {
            return Err(OpenEncError::StrictFailure {
                trigger: warning,
                warnings: self.warnings.clone(),
            });
        }

        Ok(())
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn info_count(&self) -> usize {
        self.info_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

pub fn file_label(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_on_code_and_message() {
        let mut c = Collector::new();
        c.warn(WarningCode::DANGLING_POINTER, Severity::Warning, "edge 99")
            .unwrap();
        c.warn(WarningCode::DANGLING_POINTER, Severity::Warning, "edge 99")
            .unwrap();
        assert_eq!(c.warnings().len(), 1);
        assert_eq!(c.warning_count(), 1);
    }

    #[test]
    fn distinct_messages_are_not_deduped() {
        let mut c = Collector::new();
        c.warn(WarningCode::DANGLING_POINTER, Severity::Warning, "edge 99")
            .unwrap();
        c.warn(WarningCode::DANGLING_POINTER, Severity::Warning, "edge 100")
            .unwrap();
        assert_eq!(c.warnings().len(), 2);
    }

    #[test]
    fn strict_mode_fails_on_error_severity() {
        let mut c = Collector::new();
        c.set_strict(true, 1000);
        let err = c
            .warn(WarningCode::UPDATE_GAP, Severity::Error, "gap")
            .unwrap_err();
        assert!(matches!(err, OpenEncError::StrictFailure { .. }));
    }

    #[test]
    fn strict_mode_with_zero_budget_fails_on_first_warning() {
        let mut c = Collector::new();
        c.set_strict(true, 0);
        let err = c
            .warn(WarningCode::DEPTH_OUT_OF_RANGE, Severity::Info, "deep")
            .unwrap_err();
        assert!(matches!(err, OpenEncError::StrictFailure { .. }));
    }

    #[test]
    fn non_strict_mode_never_errors() {
        let mut c = Collector::new();
        for i in 0..5 {
            c.warn(
                WarningCode::DEPTH_OUT_OF_RANGE,
                Severity::Error,
                format!("msg {i}"),
            )
            .unwrap();
        }
        assert_eq!(c.error_count(), 5);
    }
}
