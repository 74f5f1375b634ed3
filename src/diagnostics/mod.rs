//! Diagnostics: warnings, severities, and the collector/logger contract
//! driving strict-mode escalation.

mod collector;
mod warning;

pub use collector::{Collector, Logger, SilentLogger, TracingLogger};
pub use warning::{Severity, Warning, WarningCode};
