#![forbid(unsafe_code)]

use dupcheck_contracts::outcome::{RunReport, ScenarioResult};

pub fn render_verdict_line(result: &ScenarioResult) -> String {
    let verdict = if result.passed { "PASS" } else { "FAIL" };
    format!(
        "{verdict} {} [{}]: {} ({}ms)",
        result.name,
        result.policy.as_str(),
        result.detail,
        result.duration_ms
    )
}

pub fn render_run_report(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("dupcheck run against {}\n", report.target));
    out.push('\n');
    for scenario in &report.scenarios {
        out.push_str(&render_verdict_line(scenario));
        out.push('\n');
    }
    out.push('\n');

    for group in report.audit.duplicate_groups() {
        out.push_str(&format!(
            "duplicate: {} -> ids {}\n",
            group.key,
            join_ids(&group.record_ids)
        ));
    }
    for overpaid in &report.audit.overpaid_contracts {
        out.push_str(&format!(
            "overpaid: contract {} total {} paid {}\n",
            overpaid.contract_id, overpaid.total_amount, overpaid.paid_amount
        ));
    }
    if report.audit.has_findings() {
        out.push('\n');
    }

    out.push_str(&format!(
        "checks: {} total, {} passed, {} failed ({:.1}%)\n",
        report.total_checks,
        report.passed_checks,
        report.failed_checks,
        report.pass_rate_percent
    ));
    out.push_str(&format!("duration: {}ms\n", report.duration_ms));
    out
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupcheck_contracts::common::SchemaVersion;
    use dupcheck_contracts::key::BusinessKey;
    use dupcheck_contracts::outcome::{AuditGroup, AuditSnapshot, PolicyKind};

    fn scenario(name: &str, passed: bool) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            policy: PolicyKind::Uniqueness,
            outcomes: Vec::new(),
            unique_record_ids: Vec::new(),
            passed,
            detail: "5 successful, 5 unique ids across 5 attempts".to_string(),
            duration_ms: 62,
        }
    }

    fn report(scenarios: Vec<ScenarioResult>, audit: AuditSnapshot) -> RunReport {
        let total = scenarios.len() as u32;
        let passed = scenarios.iter().filter(|s| s.passed).count() as u32;
        RunReport {
            schema_version: SchemaVersion(1),
            target: "loopback".to_string(),
            started_at_epoch_ms: 1_700_000_000_000,
            duration_ms: 1_234,
            total_checks: total,
            passed_checks: passed,
            failed_checks: total - passed,
            pass_rate_percent: if total == 0 {
                0.0
            } else {
                f64::from(passed) * 100.0 / f64::from(total)
            },
            scenarios,
            audit,
        }
    }

    #[test]
    fn at_render_01_verdict_line_carries_policy_and_counts() {
        let line = render_verdict_line(&scenario("concurrent_contract_burst", true));
        assert_eq!(
            line,
            "PASS concurrent_contract_burst [uniqueness]: 5 successful, 5 unique ids across 5 attempts (62ms)"
        );
    }

    #[test]
    fn at_render_02_report_summarizes_totals() {
        let text = render_run_report(&report(
            vec![scenario("a", true), scenario("b", false)],
            AuditSnapshot::default(),
        ));
        assert!(text.contains("PASS a"));
        assert!(text.contains("FAIL b"));
        assert!(text.contains("checks: 2 total, 1 passed, 1 failed (50.0%)"));
        assert!(text.contains("duration: 1234ms"));
    }

    #[test]
    fn at_render_03_audit_findings_are_listed() {
        let audit = AuditSnapshot {
            contract_count: 2,
            payment_count: 0,
            contract_groups: vec![AuditGroup {
                key: BusinessKey::Contract {
                    customer_id: 1,
                    total_amount: 5_000_000,
                    address: "Addr-X".to_string(),
                },
                record_ids: vec![3, 7],
            }],
            payment_groups: Vec::new(),
            overpaid_contracts: Vec::new(),
        };
        let text = render_run_report(&report(vec![scenario("store_audit", false)], audit));
        assert!(text.contains("duplicate: contract(customer=1, amount=5000000, address=\"Addr-X\") -> ids 3, 7"));
    }
}
