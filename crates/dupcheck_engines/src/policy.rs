#![forbid(unsafe_code)]

use dupcheck_contracts::outcome::{
    AttemptDisposition, AuditSnapshot, PolicyKind, ScenarioResult, TestOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVerdict {
    pub passed: bool,
    pub detail: String,
}

/// Distinct identifiers among successful attempts, first occurrence first.
/// A repeated id is the signature of two logical submissions collapsing
/// into one stored record without either being rejected.
pub fn unique_success_ids(outcomes: &[TestOutcome]) -> Vec<i64> {
    let mut out = Vec::new();
    for outcome in outcomes {
        if let Some(id) = outcome.record_id() {
            if !out.contains(&id) {
                out.push(id);
            }
        }
    }
    out
}

fn success_count(outcomes: &[TestOutcome]) -> usize {
    outcomes.iter().filter(|o| o.succeeded()).count()
}

fn inconclusive_count(outcomes: &[TestOutcome]) -> usize {
    outcomes.iter().filter(|o| o.is_inconclusive()).count()
}

fn count_summary(outcomes: &[TestOutcome]) -> String {
    let successes = success_count(outcomes);
    let unique = unique_success_ids(outcomes).len();
    let inconclusive = inconclusive_count(outcomes);
    let mut out = format!(
        "{successes} successful, {unique} unique ids across {} attempts",
        outcomes.len()
    );
    if inconclusive > 0 {
        out.push_str(&format!(", {inconclusive} inconclusive"));
    }
    out
}

pub fn evaluate_uniqueness(outcomes: &[TestOutcome]) -> PolicyVerdict {
    let successes = success_count(outcomes);
    let unique = unique_success_ids(outcomes).len();
    PolicyVerdict {
        passed: successes == unique,
        detail: count_summary(outcomes),
    }
}

/// First-wins and all-distinct are both acceptable service behaviors for a
/// same-key burst; any in-between success count, or a shared id, indicates
/// partial corruption.
pub fn evaluate_bounded_success(outcomes: &[TestOutcome], distinct_payloads: u16) -> PolicyVerdict {
    let successes = success_count(outcomes);
    let unique = unique_success_ids(outcomes).len();
    let ids_unique = successes == unique;
    let bounded = successes == 1 || successes == usize::from(distinct_payloads);
    PolicyVerdict {
        passed: ids_unique && bounded,
        detail: count_summary(outcomes),
    }
}

pub fn evaluate_rejection(outcomes: &[TestOutcome]) -> PolicyVerdict {
    if outcomes.is_empty() {
        return PolicyVerdict {
            passed: false,
            detail: "no attempt settled".to_string(),
        };
    }
    for outcome in outcomes {
        match &outcome.disposition {
            AttemptDisposition::Created { record_id } => {
                return PolicyVerdict {
                    passed: false,
                    detail: format!(
                        "attempt {} was accepted with id {record_id}",
                        outcome.attempt_index
                    ),
                };
            }
            AttemptDisposition::Unreachable { cause } => {
                return PolicyVerdict {
                    passed: false,
                    detail: format!(
                        "inconclusive: attempt {} never reached the service ({cause})",
                        outcome.attempt_index
                    ),
                };
            }
            AttemptDisposition::Malformed { detail } => {
                return PolicyVerdict {
                    passed: false,
                    detail: format!(
                        "inconclusive: attempt {} settled with an uninterpretable response ({detail})",
                        outcome.attempt_index
                    ),
                };
            }
            AttemptDisposition::Rejected { .. } => {}
        }
    }
    let status = outcomes.iter().find_map(|o| match &o.disposition {
        AttemptDisposition::Rejected { status, .. } => Some(*status),
        _ => None,
    });
    PolicyVerdict {
        passed: true,
        detail: match status {
            Some(status) => format!("rejected with status {status}"),
            None => "rejected".to_string(),
        },
    }
}

pub fn evaluate_audit(snapshot: &AuditSnapshot) -> PolicyVerdict {
    let duplicates = snapshot.duplicate_groups();
    let overpaid = snapshot.overpaid_contracts.len();
    PolicyVerdict {
        passed: duplicates.is_empty() && overpaid == 0,
        detail: format!(
            "{} contracts, {} payments, {} duplicate groups, {} overpaid contracts",
            snapshot.contract_count,
            snapshot.payment_count,
            duplicates.len(),
            overpaid
        ),
    }
}

pub fn scenario_result(
    name: &str,
    policy: PolicyKind,
    outcomes: Vec<TestOutcome>,
    verdict: PolicyVerdict,
    duration_ms: u64,
) -> ScenarioResult {
    let unique_record_ids = unique_success_ids(&outcomes);
    ScenarioResult {
        name: name.to_string(),
        policy,
        outcomes,
        unique_record_ids,
        passed: verdict.passed,
        detail: verdict.detail,
        duration_ms,
    }
}

/// A scenario that was attempted but could not run (missing prerequisite)
/// still reports a verdict line; it is never silently skipped.
pub fn failed_scenario(name: &str, policy: PolicyKind, detail: String) -> ScenarioResult {
    ScenarioResult {
        name: name.to_string(),
        policy,
        outcomes: Vec::new(),
        unique_record_ids: Vec::new(),
        passed: false,
        detail,
        duration_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupcheck_contracts::key::BusinessKey;
    use dupcheck_contracts::outcome::AuditGroup;

    fn created(i: u16, id: i64) -> TestOutcome {
        TestOutcome::created(i, 10, id)
    }

    fn rejected(i: u16) -> TestOutcome {
        TestOutcome::rejected(i, 10, 409, "duplicate submission".to_string())
    }

    fn unreachable(i: u16) -> TestOutcome {
        TestOutcome::unreachable(i, 15_000, "timeout".to_string())
    }

    #[test]
    fn at_policy_01_uniqueness_passes_when_every_success_has_its_own_id() {
        let outcomes = vec![created(0, 1), created(1, 2), created(2, 3)];
        let verdict = evaluate_uniqueness(&outcomes);
        assert!(verdict.passed);
        assert_eq!(verdict.detail, "3 successful, 3 unique ids across 3 attempts");
    }

    #[test]
    fn at_policy_02_uniqueness_fails_on_a_shared_id() {
        let outcomes = vec![created(0, 7), created(1, 7), rejected(2)];
        assert!(!evaluate_uniqueness(&outcomes).passed);
    }

    #[test]
    fn at_policy_03_uniqueness_over_no_successes_passes_with_visible_detail() {
        let outcomes = vec![rejected(0), rejected(1)];
        let verdict = evaluate_uniqueness(&outcomes);
        assert!(verdict.passed);
        assert!(verdict.detail.starts_with("0 successful"));
    }

    #[test]
    fn at_policy_04_bounded_success_accepts_first_wins() {
        let outcomes = vec![created(0, 1), rejected(1), rejected(2), rejected(3), rejected(4)];
        assert!(evaluate_bounded_success(&outcomes, 5).passed);
    }

    #[test]
    fn at_policy_05_bounded_success_accepts_all_distinct() {
        let outcomes = (0..5).map(|i| created(i, i64::from(i) + 1)).collect::<Vec<_>>();
        assert!(evaluate_bounded_success(&outcomes, 5).passed);
    }

    #[test]
    fn at_policy_06_bounded_success_fails_in_between_counts() {
        let outcomes = vec![created(0, 1), created(1, 2), created(2, 3), rejected(3), rejected(4)];
        assert!(!evaluate_bounded_success(&outcomes, 5).passed);
    }

    #[test]
    fn at_policy_07_bounded_success_fails_on_shared_ids_even_at_full_count() {
        let outcomes = vec![
            created(0, 1),
            created(1, 2),
            created(2, 3),
            created(3, 4),
            created(4, 4),
        ];
        assert!(!evaluate_bounded_success(&outcomes, 5).passed);
    }

    #[test]
    fn at_policy_08_rejection_passes_only_on_a_server_judgment() {
        assert!(evaluate_rejection(&[rejected(0)]).passed);
        let verdict = evaluate_rejection(&[unreachable(0)]);
        assert!(!verdict.passed);
        assert!(verdict.detail.starts_with("inconclusive"));
        assert!(!evaluate_rejection(&[created(0, 5)]).passed);
    }

    #[test]
    fn at_policy_09_audit_fails_on_duplicates_or_overpayment() {
        let clean = AuditSnapshot {
            contract_count: 2,
            payment_count: 0,
            ..AuditSnapshot::default()
        };
        assert!(evaluate_audit(&clean).passed);

        let dirty = AuditSnapshot {
            contract_count: 2,
            payment_count: 0,
            contract_groups: vec![AuditGroup {
                key: BusinessKey::Contract {
                    customer_id: 1,
                    total_amount: 5_000_000,
                    address: "Addr-X".to_string(),
                },
                record_ids: vec![1, 2],
            }],
            ..AuditSnapshot::default()
        };
        let verdict = evaluate_audit(&dirty);
        assert!(!verdict.passed);
        assert!(verdict.detail.contains("1 duplicate groups"));
    }

    #[test]
    fn at_policy_10_scenario_result_carries_first_occurrence_ids() {
        let outcomes = vec![created(0, 9), created(1, 4), created(2, 9)];
        let verdict = evaluate_uniqueness(&outcomes);
        let result = scenario_result(
            "concurrent_contract_burst",
            PolicyKind::Uniqueness,
            outcomes,
            verdict,
            42,
        );
        assert_eq!(result.unique_record_ids, vec![9, 4]);
        assert!(!result.passed);
        assert_eq!(result.duration_ms, 42);
    }
}
