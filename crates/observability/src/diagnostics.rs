//! Diagnostics sink backed by `tracing`

use contracts::{DiagnosticReport, DiagnosticsSink, Severity};
use tracing::{error, info, warn};

/// Forwards host diagnostic reports to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, report: DiagnosticReport) {
        match report.severity {
            Severity::Info => info!(source = %report.source, "{}", report.message),
            Severity::Warning => warn!(source = %report.source, "{}", report.message),
            Severity::Error => error!(source = %report.source, "{}", report.message),
        }
    }
}
