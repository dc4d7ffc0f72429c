#![forbid(unsafe_code)]

use std::time::Instant;

use serde_json::{json, Value};

use crate::client::{Endpoint, RemoteClientRuntime, RemoteError};
use crate::config::HarnessConfig;
use crate::dispatcher::{dispatch, DispatchMode};
use dupcheck_contracts::common::ContractViolation;
use dupcheck_contracts::outcome::{
    AuditSnapshot, PolicyKind, RunReport, ScenarioResult, ScenarioState,
};
use dupcheck_contracts::record::{
    ContractDraft, JobDetailDraft, PaymentDraft, StoredContract, StoredPayment, WorkShiftDraft,
};
use dupcheck_engines::detector::build_audit_snapshot;
use dupcheck_engines::policy::{
    evaluate_audit, evaluate_bounded_success, evaluate_rejection, evaluate_uniqueness,
    failed_scenario, scenario_result, PolicyVerdict,
};
use dupcheck_engines::report::ReportAggregator;

pub const BURST_ATTEMPTS: u16 = 5;
pub const CANONICAL_CUSTOMER_ID: i64 = 1;
pub const CONTRACT_TOTAL_AMOUNT: i64 = 5_000_000;
pub const PAYMENT_AMOUNT: i64 = 1_000_000;
pub const OVERPAYMENT_AMOUNT: i64 = 50_000_000;
pub const PAYMENT_METHOD: u16 = 1;

const CONTRACT_STARTING_DATE: &str = "2024-01-15";
const CONTRACT_ENDING_DATE: &str = "2024-02-15";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteConfig {
    pub burst_attempts: u16,
    pub rapid_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl SuiteConfig {
    pub fn mvp_v1() -> Self {
        Self {
            burst_attempts: BURST_ATTEMPTS,
            rapid_interval_ms: 100,
            request_timeout_ms: 15_000,
        }
    }

    pub fn from_harness_config(config: &HarnessConfig) -> Self {
        Self {
            rapid_interval_ms: config.rapid_interval_ms,
            request_timeout_ms: config.request_timeout_ms,
            ..Self::mvp_v1()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicySelection {
    Uniqueness,
    BoundedSuccess(u16),
    Rejection,
}

/// Per-scenario lifecycle guard. A scenario moves Pending -> Dispatching ->
/// Collected -> Evaluated exactly once; any other transition is a harness
/// bug surfaced as a run fault.
struct ScenarioExecution {
    name: &'static str,
    state: ScenarioState,
    started: Instant,
}

impl ScenarioExecution {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            state: ScenarioState::Pending,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: ScenarioState) -> Result<(), String> {
        if self.state.next() != Some(next) {
            return Err(format!(
                "scenario {} cannot move from {} to {}",
                self.name,
                self.state.as_str(),
                next.as_str()
            ));
        }
        self.state = next;
        Ok(())
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioSuiteRuntime {
    config: SuiteConfig,
}

impl ScenarioSuiteRuntime {
    pub fn new(config: SuiteConfig) -> Self {
        Self { config }
    }

    /// Runs every scenario in order and folds the results into a report.
    /// Scenario failures are recorded, never corrected; only an unusable
    /// target (preflight) or an internal fault aborts the run.
    pub async fn run(&self, client: &RemoteClientRuntime) -> Result<RunReport, String> {
        let run_started = Instant::now();
        let started_at_epoch_ms = epoch_ms();
        self.preflight(client).await?;

        let mut aggregator = ReportAggregator::new();
        let mut created_contract_ids: Vec<i64> = Vec::new();

        let single_base = self.contract_payload("Addr-Single")?;
        let single = self
            .run_dispatch_scenario(
                client,
                "single_contract_creation",
                Endpoint::CustomerContract,
                move |_| with_description(&single_base, "single submission".to_string()),
                1,
                DispatchMode::Simultaneous,
                PolicySelection::BoundedSuccess(1),
            )
            .await?;
        created_contract_ids.extend(&single.unique_record_ids);
        aggregator.push(single);

        let rapid_base = self.contract_payload("Addr-Rapid")?;
        let rapid = self
            .run_dispatch_scenario(
                client,
                "rapid_contract_burst",
                Endpoint::CustomerContract,
                move |i| with_description(&rapid_base, format!("rapid submission {}", i + 1)),
                self.config.burst_attempts,
                DispatchMode::Staggered {
                    interval_ms: self.config.rapid_interval_ms,
                },
                PolicySelection::BoundedSuccess(self.config.burst_attempts),
            )
            .await?;
        created_contract_ids.extend(&rapid.unique_record_ids);
        aggregator.push(rapid);

        let concurrent_base = self.contract_payload("Addr-X")?;
        let concurrent = self
            .run_dispatch_scenario(
                client,
                "concurrent_contract_burst",
                Endpoint::CustomerContract,
                move |i| with_description(&concurrent_base, format!("concurrent submission {}", i + 1)),
                self.config.burst_attempts,
                DispatchMode::Simultaneous,
                PolicySelection::Uniqueness,
            )
            .await?;
        created_contract_ids.extend(&concurrent.unique_record_ids);
        aggregator.push(concurrent);

        match created_contract_ids.first().copied() {
            Some(contract_id) => {
                let installment =
                    self.payment_payload(contract_id, PAYMENT_AMOUNT, "installment one")?;
                let single_payment_base = installment.clone();
                let single_payment = self
                    .run_dispatch_scenario(
                        client,
                        "single_payment_creation",
                        Endpoint::CustomerPayment,
                        move |_| single_payment_base.clone(),
                        1,
                        DispatchMode::Simultaneous,
                        PolicySelection::BoundedSuccess(1),
                    )
                    .await?;
                aggregator.push(single_payment);

                // The exact payload again, five times: genuine re-submission,
                // detectable as duplicates because the business key never moves.
                let rapid_payment = self
                    .run_dispatch_scenario(
                        client,
                        "rapid_payment_burst",
                        Endpoint::CustomerPayment,
                        move |_| installment.clone(),
                        self.config.burst_attempts,
                        DispatchMode::Staggered {
                            interval_ms: self.config.rapid_interval_ms,
                        },
                        PolicySelection::Uniqueness,
                    )
                    .await?;
                aggregator.push(rapid_payment);

                let overpayment =
                    self.payment_payload(contract_id, OVERPAYMENT_AMOUNT, "overpayment probe")?;
                let overpayment_result = self
                    .run_dispatch_scenario(
                        client,
                        "overpayment_rejection",
                        Endpoint::CustomerPayment,
                        move |_| overpayment.clone(),
                        1,
                        DispatchMode::Simultaneous,
                        PolicySelection::Rejection,
                    )
                    .await?;
                aggregator.push(overpayment_result);
            }
            None => {
                let detail = "no contract was created for payment scenarios".to_string();
                aggregator.push(failed_scenario(
                    "single_payment_creation",
                    PolicyKind::BoundedSuccess,
                    detail.clone(),
                ));
                aggregator.push(failed_scenario(
                    "rapid_payment_burst",
                    PolicyKind::Uniqueness,
                    detail.clone(),
                ));
                aggregator.push(failed_scenario(
                    "overpayment_rejection",
                    PolicyKind::Rejection,
                    detail,
                ));
            }
        }

        let invalid_contract = invalid_contract_payload();
        let invalid_contract_result = self
            .run_dispatch_scenario(
                client,
                "invalid_contract_rejection",
                Endpoint::CustomerContract,
                move |_| invalid_contract.clone(),
                1,
                DispatchMode::Simultaneous,
                PolicySelection::Rejection,
            )
            .await?;
        aggregator.push(invalid_contract_result);

        let invalid_payment = invalid_payment_payload();
        let invalid_payment_result = self
            .run_dispatch_scenario(
                client,
                "invalid_payment_rejection",
                Endpoint::CustomerPayment,
                move |_| invalid_payment.clone(),
                1,
                DispatchMode::Simultaneous,
                PolicySelection::Rejection,
            )
            .await?;
        aggregator.push(invalid_payment_result);

        let (audit_result, snapshot) = self.run_audit(client).await?;
        aggregator.push(audit_result);

        Ok(aggregator.finish(
            snapshot,
            client.target_label(),
            started_at_epoch_ms,
            run_started.elapsed().as_millis() as u64,
        ))
    }

    async fn preflight(&self, client: &RemoteClientRuntime) -> Result<(), String> {
        if let Err(err) = self.fetch_contracts(client).await? {
            return Err(format!("preflight: contract collection unavailable: {err}"));
        }
        if let Err(err) = self.fetch_payments(client).await? {
            return Err(format!("preflight: payment collection unavailable: {err}"));
        }
        Ok(())
    }

    async fn run_dispatch_scenario<F>(
        &self,
        client: &RemoteClientRuntime,
        name: &'static str,
        endpoint: Endpoint,
        payload_factory: F,
        count: u16,
        mode: DispatchMode,
        policy: PolicySelection,
    ) -> Result<ScenarioResult, String>
    where
        F: FnMut(u16) -> Value,
    {
        let mut execution = ScenarioExecution::new(name);
        execution.advance(ScenarioState::Dispatching)?;
        let outcomes = dispatch(
            client,
            endpoint,
            payload_factory,
            count,
            mode,
            self.config.request_timeout_ms,
        )
        .await;
        execution.advance(ScenarioState::Collected)?;
        let (kind, verdict) = match policy {
            PolicySelection::Uniqueness => (PolicyKind::Uniqueness, evaluate_uniqueness(&outcomes)),
            PolicySelection::BoundedSuccess(distinct) => (
                PolicyKind::BoundedSuccess,
                evaluate_bounded_success(&outcomes, distinct),
            ),
            PolicySelection::Rejection => (PolicyKind::Rejection, evaluate_rejection(&outcomes)),
        };
        execution.advance(ScenarioState::Evaluated)?;
        Ok(scenario_result(
            name,
            kind,
            outcomes,
            verdict,
            execution.elapsed_ms(),
        ))
    }

    async fn run_audit(
        &self,
        client: &RemoteClientRuntime,
    ) -> Result<(ScenarioResult, AuditSnapshot), String> {
        let mut execution = ScenarioExecution::new("store_audit");
        execution.advance(ScenarioState::Dispatching)?;
        let contracts = self.fetch_contracts(client).await?;
        let payments = self.fetch_payments(client).await?;
        execution.advance(ScenarioState::Collected)?;

        let (verdict, snapshot) = match (contracts, payments) {
            (Ok(contracts), Ok(payments)) => match build_audit_snapshot(&contracts, &payments) {
                Ok(snapshot) => (evaluate_audit(&snapshot), snapshot),
                Err(malformed) => (
                    PolicyVerdict {
                        passed: false,
                        detail: format!("audit aborted: {malformed}"),
                    },
                    AuditSnapshot::default(),
                ),
            },
            (Err(err), _) | (_, Err(err)) => (
                PolicyVerdict {
                    passed: false,
                    detail: format!("audit fetch inconclusive: {err}"),
                },
                AuditSnapshot::default(),
            ),
        };
        execution.advance(ScenarioState::Evaluated)?;
        Ok((
            scenario_result(
                "store_audit",
                PolicyKind::Audit,
                Vec::new(),
                verdict,
                execution.elapsed_ms(),
            ),
            snapshot,
        ))
    }

    async fn fetch_contracts(
        &self,
        client: &RemoteClientRuntime,
    ) -> Result<Result<Vec<StoredContract>, RemoteError>, String> {
        let task_client = client.clone();
        let timeout_ms = self.config.request_timeout_ms;
        tokio::task::spawn_blocking(move || task_client.list_contracts(timeout_ms))
            .await
            .map_err(|e| format!("contract listing task failed: {e}"))
    }

    async fn fetch_payments(
        &self,
        client: &RemoteClientRuntime,
    ) -> Result<Result<Vec<StoredPayment>, RemoteError>, String> {
        let task_client = client.clone();
        let timeout_ms = self.config.request_timeout_ms;
        tokio::task::spawn_blocking(move || task_client.list_payments(timeout_ms))
            .await
            .map_err(|e| format!("payment listing task failed: {e}"))
    }

    fn contract_payload(&self, address: &str) -> Result<Value, String> {
        let shift = WorkShiftDraft::v1(
            "08:00".to_string(),
            "17:00".to_string(),
            2,
            500_000,
            "1,2,3,4,5".to_string(),
        )
        .map_err(draft_fault)?;
        let detail = JobDetailDraft::v1(
            1,
            CONTRACT_STARTING_DATE.to_string(),
            CONTRACT_ENDING_DATE.to_string(),
            "Site A".to_string(),
            vec![shift],
        )
        .map_err(draft_fault)?;
        let draft = ContractDraft::v1(
            CANONICAL_CUSTOMER_ID,
            CONTRACT_STARTING_DATE.to_string(),
            CONTRACT_ENDING_DATE.to_string(),
            CONTRACT_TOTAL_AMOUNT,
            address.to_string(),
            "pending submission".to_string(),
            vec![detail],
        )
        .map_err(draft_fault)?;
        serde_json::to_value(draft).map_err(|e| format!("contract payload encode failed: {e}"))
    }

    fn payment_payload(&self, contract_id: i64, amount: i64, note: &str) -> Result<Value, String> {
        let draft = PaymentDraft::v1(
            amount,
            PAYMENT_METHOD,
            note.to_string(),
            contract_id,
            CANONICAL_CUSTOMER_ID,
        )
        .map_err(draft_fault)?;
        serde_json::to_value(draft).map_err(|e| format!("payment payload encode failed: {e}"))
    }
}

fn draft_fault(violation: ContractViolation) -> String {
    format!("harness draft failed validation: {violation}")
}

fn with_description(base: &Value, description: String) -> Value {
    let mut out = base.clone();
    if let Some(object) = out.as_object_mut() {
        object.insert("description".to_string(), Value::String(description));
    }
    out
}

/// The payloads a buggy client would send, verbatim: null owner, inverted
/// dates, negative amounts, unknown method, nonexistent ids. Built as raw
/// json because the drafts' constructors would rightly refuse them.
fn invalid_contract_payload() -> Value {
    json!({
        "customerId": Value::Null,
        "startingDate": "2024-01-15",
        "endingDate": "2024-01-10",
        "totalAmount": -1_000,
        "address": "",
        "jobDetails": [],
    })
}

fn invalid_payment_payload() -> Value {
    json!({
        "paymentAmount": -1_000,
        "paymentMethod": 999,
        "customerContractId": 99_999,
        "customerId": 99_999,
    })
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
