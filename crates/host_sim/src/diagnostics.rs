//! Diagnostics sink that keeps every report

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{DiagnosticReport, DiagnosticsSink, Severity};

#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    reports: Mutex<Vec<DiagnosticReport>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DiagnosticReport>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reports(&self) -> Vec<DiagnosticReport> {
        self.lock().clone()
    }

    /// Number of reports with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|r| r.severity == severity).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn report(&self, report: DiagnosticReport) {
        self.lock().push(report);
    }
}
