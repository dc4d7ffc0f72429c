#![forbid(unsafe_code)]

use crate::record::{ContractDraft, PaymentDraft, StoredContract, StoredPayment};

/// Composite key identifying a logical submission independent of the id the
/// remote store assigned it. Field order is part of the contract: two records
/// with equal keys are the same logical submission, whatever their other
/// fields say.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessKey {
    Contract {
        customer_id: i64,
        total_amount: i64,
        address: String,
    },
    Payment {
        customer_contract_id: i64,
        payment_amount: i64,
        note: String,
    },
}

impl std::fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusinessKey::Contract {
                customer_id,
                total_amount,
                address,
            } => write!(
                f,
                "contract(customer={customer_id}, amount={total_amount}, address={address:?})"
            ),
            BusinessKey::Payment {
                customer_contract_id,
                payment_amount,
                note,
            } => write!(
                f,
                "payment(contract={customer_contract_id}, amount={payment_amount}, note={note:?})"
            ),
        }
    }
}

/// Key derivation failure: the record is missing a field the key tuple
/// needs. A partial key would silently conflate unrelated records, so the
/// derivation refuses instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub entity: &'static str,
    pub record_id: i64,
    pub field: &'static str,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} record {} is missing {}",
            self.entity, self.record_id, self.field
        )
    }
}

impl std::error::Error for MalformedRecord {}

pub trait BusinessKeyed {
    fn record_id(&self) -> i64;
    fn business_key(&self) -> Result<BusinessKey, MalformedRecord>;
}

impl BusinessKeyed for StoredContract {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn business_key(&self) -> Result<BusinessKey, MalformedRecord> {
        let missing = |field| MalformedRecord {
            entity: "contract",
            record_id: self.id,
            field,
        };
        Ok(BusinessKey::Contract {
            customer_id: self.customer_id.ok_or_else(|| missing("customerId"))?,
            total_amount: self.total_amount.ok_or_else(|| missing("totalAmount"))?,
            address: self.address.clone().ok_or_else(|| missing("address"))?,
        })
    }
}

impl BusinessKeyed for StoredPayment {
    fn record_id(&self) -> i64 {
        self.id
    }

    fn business_key(&self) -> Result<BusinessKey, MalformedRecord> {
        let missing = |field| MalformedRecord {
            entity: "payment",
            record_id: self.id,
            field,
        };
        Ok(BusinessKey::Payment {
            customer_contract_id: self
                .customer_contract_id
                .ok_or_else(|| missing("customerContractId"))?,
            payment_amount: self
                .payment_amount
                .ok_or_else(|| missing("paymentAmount"))?,
            note: self.note.clone().ok_or_else(|| missing("note"))?,
        })
    }
}

impl ContractDraft {
    pub fn business_key(&self) -> BusinessKey {
        BusinessKey::Contract {
            customer_id: self.customer_id,
            total_amount: self.total_amount,
            address: self.address.clone(),
        }
    }
}

impl PaymentDraft {
    pub fn business_key(&self) -> BusinessKey {
        BusinessKey::Payment {
            customer_contract_id: self.customer_contract_id,
            payment_amount: self.payment_amount,
            note: self.note.clone(),
        }
    }
}
