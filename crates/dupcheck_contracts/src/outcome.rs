#![forbid(unsafe_code)]

use crate::common::SchemaVersion;
use crate::key::BusinessKey;

pub const RUN_REPORT_VERSION: SchemaVersion = SchemaVersion(1);

/// How a single attempt settled. The tag carries everything the policies
/// need: a `Rejected` is a server-judged business answer, an `Unreachable`
/// is inconclusive, a `Malformed` marks a response the harness could not
/// interpret.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttemptDisposition {
    Created { record_id: i64 },
    Rejected { status: u16, message: String },
    Unreachable { cause: String },
    Malformed { detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TestOutcome {
    pub attempt_index: u16,
    pub latency_ms: u64,
    pub disposition: AttemptDisposition,
}

impl TestOutcome {
    pub fn created(attempt_index: u16, latency_ms: u64, record_id: i64) -> Self {
        Self {
            attempt_index,
            latency_ms,
            disposition: AttemptDisposition::Created { record_id },
        }
    }

    pub fn rejected(attempt_index: u16, latency_ms: u64, status: u16, message: String) -> Self {
        Self {
            attempt_index,
            latency_ms,
            disposition: AttemptDisposition::Rejected { status, message },
        }
    }

    pub fn unreachable(attempt_index: u16, latency_ms: u64, cause: String) -> Self {
        Self {
            attempt_index,
            latency_ms,
            disposition: AttemptDisposition::Unreachable { cause },
        }
    }

    pub fn malformed(attempt_index: u16, latency_ms: u64, detail: String) -> Self {
        Self {
            attempt_index,
            latency_ms,
            disposition: AttemptDisposition::Malformed { detail },
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.disposition, AttemptDisposition::Created { .. })
    }

    pub fn record_id(&self) -> Option<i64> {
        match self.disposition {
            AttemptDisposition::Created { record_id } => Some(record_id),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.disposition, AttemptDisposition::Rejected { .. })
    }

    pub fn is_inconclusive(&self) -> bool {
        matches!(
            self.disposition,
            AttemptDisposition::Unreachable { .. } | AttemptDisposition::Malformed { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Uniqueness,
    BoundedSuccess,
    Rejection,
    Audit,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Uniqueness => "uniqueness",
            PolicyKind::BoundedSuccess => "bounded_success",
            PolicyKind::Rejection => "rejection",
            PolicyKind::Audit => "audit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Pending,
    Dispatching,
    Collected,
    Evaluated,
}

impl ScenarioState {
    pub fn next(self) -> Option<ScenarioState> {
        match self {
            ScenarioState::Pending => Some(ScenarioState::Dispatching),
            ScenarioState::Dispatching => Some(ScenarioState::Collected),
            ScenarioState::Collected => Some(ScenarioState::Evaluated),
            ScenarioState::Evaluated => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioState::Pending => "pending",
            ScenarioState::Dispatching => "dispatching",
            ScenarioState::Collected => "collected",
            ScenarioState::Evaluated => "evaluated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub policy: PolicyKind,
    pub outcomes: Vec<TestOutcome>,
    pub unique_record_ids: Vec<i64>,
    pub passed: bool,
    pub detail: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AuditGroup {
    pub key: BusinessKey,
    pub record_ids: Vec<i64>,
}

impl AuditGroup {
    pub fn multiplicity(&self) -> usize {
        self.record_ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OverpaidContract {
    pub contract_id: i64,
    pub total_amount: i64,
    pub paid_amount: i64,
}

/// Point-in-time grouping of the remote store, rebuilt fresh on every
/// audit call.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AuditSnapshot {
    pub contract_count: u32,
    pub payment_count: u32,
    pub contract_groups: Vec<AuditGroup>,
    pub payment_groups: Vec<AuditGroup>,
    pub overpaid_contracts: Vec<OverpaidContract>,
}

impl AuditSnapshot {
    pub fn duplicate_groups(&self) -> Vec<&AuditGroup> {
        self.contract_groups
            .iter()
            .chain(self.payment_groups.iter())
            .filter(|group| group.multiplicity() > 1)
            .collect()
    }

    pub fn has_findings(&self) -> bool {
        !self.duplicate_groups().is_empty() || !self.overpaid_contracts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RunReport {
    pub schema_version: SchemaVersion,
    pub target: String,
    pub started_at_epoch_ms: u64,
    pub duration_ms: u64,
    pub total_checks: u32,
    pub passed_checks: u32,
    pub failed_checks: u32,
    pub pass_rate_percent: f64,
    pub scenarios: Vec<ScenarioResult>,
    pub audit: AuditSnapshot,
}
