#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};

use dupcheck_contracts::key::{BusinessKey, BusinessKeyed, MalformedRecord};
use dupcheck_contracts::outcome::{AuditGroup, AuditSnapshot, OverpaidContract};
use dupcheck_contracts::record::{StoredContract, StoredPayment};

/// Groups records by business key, preserving first-occurrence order so the
/// report lists collisions in the order the store returned them. The first
/// malformed record aborts the whole grouping: a partial audit would report
/// a clean store it never actually inspected.
pub fn group_by_business_key<R: BusinessKeyed>(
    records: &[R],
) -> Result<Vec<AuditGroup>, MalformedRecord> {
    let mut groups: Vec<AuditGroup> = Vec::new();
    let mut index_by_key: HashMap<BusinessKey, usize> = HashMap::new();
    for record in records {
        let key = record.business_key()?;
        match index_by_key.get(&key) {
            Some(&at) => groups[at].record_ids.push(record.record_id()),
            None => {
                index_by_key.insert(key.clone(), groups.len());
                groups.push(AuditGroup {
                    key,
                    record_ids: vec![record.record_id()],
                });
            }
        }
    }
    Ok(groups)
}

pub fn duplicate_groups(groups: &[AuditGroup]) -> Vec<AuditGroup> {
    groups
        .iter()
        .filter(|group| group.multiplicity() > 1)
        .cloned()
        .collect()
}

/// Sums settled payments per contract and reports every contract whose paid
/// total exceeds its contract total. Payments referencing a contract id
/// absent from the contract listing have no total to compare against and
/// are left to the duplicate grouping.
pub fn overpaid_contracts(
    contracts: &[StoredContract],
    payments: &[StoredPayment],
) -> Result<Vec<OverpaidContract>, MalformedRecord> {
    let mut totals: BTreeMap<i64, i64> = BTreeMap::new();
    for contract in contracts {
        let total = contract.total_amount.ok_or(MalformedRecord {
            entity: "contract",
            record_id: contract.id,
            field: "totalAmount",
        })?;
        totals.insert(contract.id, total);
    }

    let mut paid: BTreeMap<i64, i64> = BTreeMap::new();
    for payment in payments {
        let contract_id = payment.customer_contract_id.ok_or(MalformedRecord {
            entity: "payment",
            record_id: payment.id,
            field: "customerContractId",
        })?;
        let amount = payment.payment_amount.ok_or(MalformedRecord {
            entity: "payment",
            record_id: payment.id,
            field: "paymentAmount",
        })?;
        if totals.contains_key(&contract_id) {
            let entry = paid.entry(contract_id).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    let mut out = Vec::new();
    for (contract_id, paid_amount) in paid {
        let total_amount = totals.get(&contract_id).copied().unwrap_or(0);
        if paid_amount > total_amount {
            out.push(OverpaidContract {
                contract_id,
                total_amount,
                paid_amount,
            });
        }
    }
    Ok(out)
}

pub fn build_audit_snapshot(
    contracts: &[StoredContract],
    payments: &[StoredPayment],
) -> Result<AuditSnapshot, MalformedRecord> {
    Ok(AuditSnapshot {
        contract_count: contracts.len() as u32,
        payment_count: payments.len() as u32,
        contract_groups: group_by_business_key(contracts)?,
        payment_groups: group_by_business_key(payments)?,
        overpaid_contracts: overpaid_contracts(contracts, payments)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(id: i64, customer_id: i64, total_amount: i64, address: &str) -> StoredContract {
        StoredContract {
            id,
            customer_id: Some(customer_id),
            total_amount: Some(total_amount),
            address: Some(address.to_string()),
            description: Some(format!("submission {id}")),
            status: Some("CREATED".to_string()),
        }
    }

    fn payment(id: i64, contract_id: i64, amount: i64, note: &str) -> StoredPayment {
        StoredPayment {
            id,
            payment_amount: Some(amount),
            payment_method: Some(1),
            note: Some(note.to_string()),
            customer_contract_id: Some(contract_id),
            customer_id: Some(1),
        }
    }

    #[test]
    fn at_detector_01_grouping_preserves_first_occurrence_order() {
        let records = vec![
            contract(10, 1, 5_000_000, "Addr-B"),
            contract(11, 1, 5_000_000, "Addr-A"),
            contract(12, 1, 5_000_000, "Addr-B"),
        ];
        let groups = group_by_business_key(&records).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].record_ids, vec![10, 12]);
        assert_eq!(groups[1].record_ids, vec![11]);
    }

    #[test]
    fn at_detector_02_collision_ignores_fields_outside_the_key() {
        let mut a = contract(1, 1, 5_000_000, "Addr-X");
        let mut b = contract(2, 1, 5_000_000, "Addr-X");
        a.description = Some("first click".to_string());
        b.description = Some("second click".to_string());
        b.status = Some("PAID".to_string());
        let groups = group_by_business_key(&[a, b]).unwrap();
        let duplicates = duplicate_groups(&groups);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].record_ids, vec![1, 2]);
    }

    #[test]
    fn at_detector_03_malformed_record_aborts_grouping() {
        let mut bad = contract(7, 1, 5_000_000, "Addr-X");
        bad.address = None;
        let err = group_by_business_key(&[contract(1, 1, 5_000_000, "Addr-Y"), bad]).unwrap_err();
        assert_eq!(err.record_id, 7);
        assert_eq!(err.field, "address");
    }

    #[test]
    fn at_detector_04_overpaid_contract_is_reported() {
        let contracts = vec![contract(1, 1, 5_000_000, "Addr-X")];
        let payments = vec![
            payment(1, 1, 3_000_000, "installment one"),
            payment(2, 1, 3_000_000, "installment two"),
        ];
        let overpaid = overpaid_contracts(&contracts, &payments).unwrap();
        assert_eq!(
            overpaid,
            vec![OverpaidContract {
                contract_id: 1,
                total_amount: 5_000_000,
                paid_amount: 6_000_000,
            }]
        );
    }

    #[test]
    fn at_detector_05_paid_exactly_total_is_not_overpaid() {
        let contracts = vec![contract(1, 1, 5_000_000, "Addr-X")];
        let payments = vec![
            payment(1, 1, 2_500_000, "installment one"),
            payment(2, 1, 2_500_000, "installment two"),
        ];
        assert!(overpaid_contracts(&contracts, &payments)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn at_detector_06_payment_against_unknown_contract_is_skipped() {
        let contracts = vec![contract(1, 1, 5_000_000, "Addr-X")];
        let payments = vec![payment(1, 99, 50_000_000, "stray payment")];
        assert!(overpaid_contracts(&contracts, &payments)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn at_detector_07_snapshot_is_idempotent_over_identical_input() {
        let contracts = vec![
            contract(1, 1, 5_000_000, "Addr-X"),
            contract(2, 1, 5_000_000, "Addr-X"),
        ];
        let payments = vec![payment(1, 1, 1_000_000, "installment one")];
        let first = build_audit_snapshot(&contracts, &payments).unwrap();
        let second = build_audit_snapshot(&contracts, &payments).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.duplicate_groups().len(), 1);
        assert_eq!(first.contract_count, 2);
        assert_eq!(first.payment_count, 1);
    }
}
