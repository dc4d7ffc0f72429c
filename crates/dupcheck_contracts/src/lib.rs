#![forbid(unsafe_code)]

pub mod common;
pub mod key;
pub mod outcome;
pub mod record;

pub use common::{ContractViolation, SchemaVersion, Validate};
pub use key::{BusinessKey, BusinessKeyed, MalformedRecord};
pub use outcome::{
    AttemptDisposition, AuditGroup, AuditSnapshot, OverpaidContract, PolicyKind, RunReport,
    ScenarioResult, ScenarioState, TestOutcome,
};
pub use record::{
    ContractDraft, JobDetailDraft, PaymentDraft, StoredContract, StoredPayment, WorkShiftDraft,
};
