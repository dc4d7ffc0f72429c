#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::client::{CreatedRecord, Endpoint, RemoteError};
use dupcheck_contracts::common::Validate;
use dupcheck_contracts::key::BusinessKeyed;
use dupcheck_contracts::record::{ContractDraft, PaymentDraft, StoredContract, StoredPayment};

/// In-memory stand-in for the remote services: validates drafts, rejects
/// duplicate business keys first-wins, refuses overpayment, and serves the
/// audit listings. Default target when no URL is configured, and the
/// end-to-end fixture the suite tests run against.
#[derive(Debug, Clone, Default)]
pub struct LoopbackRemote {
    store: Arc<Mutex<LoopbackStore>>,
}

#[derive(Debug)]
struct LoopbackStore {
    next_id: i64,
    contracts: Vec<StoredContract>,
    payments: Vec<StoredPayment>,
}

impl Default for LoopbackStore {
    fn default() -> Self {
        Self {
            next_id: 1,
            contracts: Vec::new(),
            payments: Vec::new(),
        }
    }
}

impl LoopbackRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LoopbackStore>, RemoteError> {
        self.store.lock().map_err(|_| RemoteError::Unreachable {
            cause: "loopback store lock poisoned".to_string(),
        })
    }

    pub fn submit(&self, endpoint: Endpoint, payload: &Value) -> Result<CreatedRecord, RemoteError> {
        let mut store = self.lock()?;
        match endpoint {
            Endpoint::CustomerContract => submit_contract(&mut store, payload),
            Endpoint::CustomerPayment => submit_payment(&mut store, payload),
        }
    }

    pub fn list_contracts(&self) -> Result<Vec<StoredContract>, RemoteError> {
        Ok(self.lock()?.contracts.clone())
    }

    pub fn list_payments(&self) -> Result<Vec<StoredPayment>, RemoteError> {
        Ok(self.lock()?.payments.clone())
    }
}

fn submit_contract(
    store: &mut LoopbackStore,
    payload: &Value,
) -> Result<CreatedRecord, RemoteError> {
    let draft: ContractDraft =
        serde_json::from_value(payload.clone()).map_err(|_| RemoteError::Rejected {
            status: 400,
            message: "contract payload is not a valid contract draft".to_string(),
        })?;
    draft.validate().map_err(|violation| RemoteError::Rejected {
        status: 400,
        message: format!("contract validation failed: {violation}"),
    })?;

    let key = draft.business_key();
    let collides = store
        .contracts
        .iter()
        .any(|existing| existing.business_key().ok().as_ref() == Some(&key));
    if collides {
        return Err(RemoteError::Rejected {
            status: 409,
            message: "duplicate contract submission".to_string(),
        });
    }

    let id = store.next_id;
    store.next_id += 1;
    store.contracts.push(StoredContract {
        id,
        customer_id: Some(draft.customer_id),
        total_amount: Some(draft.total_amount),
        address: Some(draft.address),
        description: Some(draft.description),
        status: Some("CREATED".to_string()),
    });
    Ok(CreatedRecord { id })
}

fn submit_payment(
    store: &mut LoopbackStore,
    payload: &Value,
) -> Result<CreatedRecord, RemoteError> {
    let draft: PaymentDraft =
        serde_json::from_value(payload.clone()).map_err(|_| RemoteError::Rejected {
            status: 400,
            message: "payment payload is not a valid payment draft".to_string(),
        })?;
    draft.validate().map_err(|violation| RemoteError::Rejected {
        status: 400,
        message: format!("payment validation failed: {violation}"),
    })?;

    let contract = store
        .contracts
        .iter()
        .find(|c| c.id == draft.customer_contract_id)
        .ok_or_else(|| RemoteError::Rejected {
            status: 404,
            message: "customer contract not found".to_string(),
        })?;
    if contract.customer_id != Some(draft.customer_id) {
        return Err(RemoteError::Rejected {
            status: 400,
            message: "payment customer does not own the contract".to_string(),
        });
    }

    let key = draft.business_key();
    let collides = store
        .payments
        .iter()
        .any(|existing| existing.business_key().ok().as_ref() == Some(&key));
    if collides {
        return Err(RemoteError::Rejected {
            status: 409,
            message: "duplicate payment submission".to_string(),
        });
    }

    let total = contract.total_amount.unwrap_or(0);
    let paid: i64 = store
        .payments
        .iter()
        .filter(|p| p.customer_contract_id == Some(draft.customer_contract_id))
        .map(|p| p.payment_amount.unwrap_or(0))
        .sum();
    if paid.saturating_add(draft.payment_amount) > total {
        return Err(RemoteError::Rejected {
            status: 400,
            message: "payment exceeds contract total".to_string(),
        });
    }

    let id = store.next_id;
    store.next_id += 1;
    store.payments.push(StoredPayment {
        id,
        payment_amount: Some(draft.payment_amount),
        payment_method: Some(draft.payment_method),
        note: Some(draft.note),
        customer_contract_id: Some(draft.customer_contract_id),
        customer_id: Some(draft.customer_id),
    });
    Ok(CreatedRecord { id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dupcheck_contracts::record::{JobDetailDraft, WorkShiftDraft};

    fn contract_payload(address: &str, description: &str) -> Value {
        let shift = WorkShiftDraft::v1(
            "08:00".to_string(),
            "17:00".to_string(),
            2,
            500_000,
            "1,2,3,4,5".to_string(),
        )
        .unwrap();
        let detail = JobDetailDraft::v1(
            1,
            "2024-01-15".to_string(),
            "2024-02-15".to_string(),
            "Site A".to_string(),
            vec![shift],
        )
        .unwrap();
        let draft = ContractDraft::v1(
            1,
            "2024-01-15".to_string(),
            "2024-02-15".to_string(),
            5_000_000,
            address.to_string(),
            description.to_string(),
            vec![detail],
        )
        .unwrap();
        serde_json::to_value(draft).unwrap()
    }

    fn payment_payload(contract_id: i64, amount: i64, note: &str) -> Value {
        let draft = PaymentDraft::v1(amount, 1, note.to_string(), contract_id, 1).unwrap();
        serde_json::to_value(draft).unwrap()
    }

    #[test]
    fn at_loopback_01_contract_creation_assigns_sequential_ids() {
        let remote = LoopbackRemote::new();
        let a = remote
            .submit(Endpoint::CustomerContract, &contract_payload("Addr-A", "first"))
            .unwrap();
        let b = remote
            .submit(Endpoint::CustomerContract, &contract_payload("Addr-B", "second"))
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(remote.list_contracts().unwrap().len(), 2);
    }

    #[test]
    fn at_loopback_02_duplicate_contract_is_first_wins_409() {
        let remote = LoopbackRemote::new();
        remote
            .submit(Endpoint::CustomerContract, &contract_payload("Addr-X", "first click"))
            .unwrap();
        let err = remote
            .submit(
                Endpoint::CustomerContract,
                &contract_payload("Addr-X", "second click"),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Rejected {
                status: 409,
                message: "duplicate contract submission".to_string(),
            }
        );
        assert_eq!(remote.list_contracts().unwrap().len(), 1);
    }

    #[test]
    fn at_loopback_03_invalid_contract_payload_is_rejected_400() {
        let remote = LoopbackRemote::new();
        let invalid = serde_json::json!({
            "customerId": Value::Null,
            "startingDate": "2024-01-15",
            "endingDate": "2024-01-10",
            "totalAmount": -1_000,
            "address": "",
            "jobDetails": [],
        });
        let err = remote
            .submit(Endpoint::CustomerContract, &invalid)
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 400, .. }));
    }

    #[test]
    fn at_loopback_04_payment_against_unknown_contract_is_rejected() {
        let remote = LoopbackRemote::new();
        let err = remote
            .submit(
                Endpoint::CustomerPayment,
                &payment_payload(99_999, 1_000_000, "stray"),
            )
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 404, .. }));
    }

    #[test]
    fn at_loopback_05_overpayment_is_rejected_400() {
        let remote = LoopbackRemote::new();
        let contract = remote
            .submit(Endpoint::CustomerContract, &contract_payload("Addr-P", "payable"))
            .unwrap();
        let err = remote
            .submit(
                Endpoint::CustomerPayment,
                &payment_payload(contract.id, 50_000_000, "overpayment probe"),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RemoteError::Rejected {
                status: 400,
                message: "payment exceeds contract total".to_string(),
            }
        );
    }

    #[test]
    fn at_loopback_06_cumulative_payments_stay_within_total() {
        let remote = LoopbackRemote::new();
        let contract = remote
            .submit(Endpoint::CustomerContract, &contract_payload("Addr-C", "payable"))
            .unwrap();
        for i in 0..5 {
            remote
                .submit(
                    Endpoint::CustomerPayment,
                    &payment_payload(contract.id, 1_000_000, &format!("installment {i}")),
                )
                .unwrap();
        }
        let err = remote
            .submit(
                Endpoint::CustomerPayment,
                &payment_payload(contract.id, 1_000_000, "one too many"),
            )
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 400, .. }));
        assert_eq!(remote.list_payments().unwrap().len(), 5);
    }

    #[test]
    fn at_loopback_07_duplicate_payment_is_rejected_409() {
        let remote = LoopbackRemote::new();
        let contract = remote
            .submit(Endpoint::CustomerContract, &contract_payload("Addr-D", "payable"))
            .unwrap();
        let payload = payment_payload(contract.id, 1_000_000, "installment one");
        remote.submit(Endpoint::CustomerPayment, &payload).unwrap();
        let err = remote
            .submit(Endpoint::CustomerPayment, &payload)
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { status: 409, .. }));
    }
}
