#![forbid(unsafe_code)]

use dupcheck_contracts::outcome::{AuditSnapshot, RunReport, ScenarioResult, RUN_REPORT_VERSION};

/// Folds immutable scenario results into the final report. Totals are
/// always recomputed from the folded rows; there are no independent
/// counters to drift.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    scenarios: Vec<ScenarioResult>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ScenarioResult) {
        self.scenarios.push(result);
    }

    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    pub fn finish(
        self,
        audit: AuditSnapshot,
        target: String,
        started_at_epoch_ms: u64,
        duration_ms: u64,
    ) -> RunReport {
        let total_checks = self.scenarios.len() as u32;
        let passed_checks = self.scenarios.iter().filter(|s| s.passed).count() as u32;
        let failed_checks = total_checks - passed_checks;
        let pass_rate_percent = if total_checks == 0 {
            0.0
        } else {
            f64::from(passed_checks) * 100.0 / f64::from(total_checks)
        };
        RunReport {
            schema_version: RUN_REPORT_VERSION,
            target,
            started_at_epoch_ms,
            duration_ms,
            total_checks,
            passed_checks,
            failed_checks,
            pass_rate_percent,
            scenarios: self.scenarios,
            audit,
        }
    }
}
