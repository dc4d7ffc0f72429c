#![forbid(unsafe_code)]

use crate::common::{validate_positive_amount, validate_text, ContractViolation, Validate};

pub const MAX_AMOUNT: i64 = 1_000_000_000_000;
pub const MAX_JOB_DETAILS: usize = 32;
pub const MAX_WORK_SHIFTS: usize = 16;
pub const MAX_PAYMENT_METHOD: u16 = 8;

fn validate_iso_date(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be YYYY-MM-DD",
        });
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit());
    if !digits_ok {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be YYYY-MM-DD",
        });
    }
    let month: u32 = value[5..7].parse().unwrap_or(0);
    let day: u32 = value[8..10].parse().unwrap_or(0);
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "month or day out of range",
        });
    }
    Ok(())
}

fn validate_clock(field: &'static str, value: &str) -> Result<(), ContractViolation> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be HH:MM",
        });
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !digits_ok {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be HH:MM",
        });
    }
    let hour: u32 = value[0..2].parse().unwrap_or(99);
    let minute: u32 = value[3..5].parse().unwrap_or(99);
    if hour > 23 || minute > 59 {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "hour or minute out of range",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkShiftDraft {
    pub start_time: String,
    pub end_time: String,
    pub number_of_workers: u16,
    pub salary: i64,
    pub working_days: String,
}

impl WorkShiftDraft {
    pub fn v1(
        start_time: String,
        end_time: String,
        number_of_workers: u16,
        salary: i64,
        working_days: String,
    ) -> Result<Self, ContractViolation> {
        let shift = Self {
            start_time,
            end_time,
            number_of_workers,
            salary,
            working_days,
        };
        shift.validate()?;
        Ok(shift)
    }
}

impl Validate for WorkShiftDraft {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_clock("work_shift.start_time", &self.start_time)?;
        validate_clock("work_shift.end_time", &self.end_time)?;
        if self.number_of_workers == 0 || self.number_of_workers > 1_000 {
            return Err(ContractViolation::InvalidRange {
                field: "work_shift.number_of_workers",
                min: 1,
                max: 1_000,
                got: i64::from(self.number_of_workers),
            });
        }
        validate_positive_amount("work_shift.salary", self.salary, MAX_AMOUNT)?;
        validate_text("work_shift.working_days", &self.working_days, 32)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetailDraft {
    pub job_category_id: i64,
    pub start_date: String,
    pub end_date: String,
    pub work_location: String,
    pub work_shifts: Vec<WorkShiftDraft>,
}

impl JobDetailDraft {
    pub fn v1(
        job_category_id: i64,
        start_date: String,
        end_date: String,
        work_location: String,
        work_shifts: Vec<WorkShiftDraft>,
    ) -> Result<Self, ContractViolation> {
        let detail = Self {
            job_category_id,
            start_date,
            end_date,
            work_location,
            work_shifts,
        };
        detail.validate()?;
        Ok(detail)
    }
}

impl Validate for JobDetailDraft {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.job_category_id < 1 {
            return Err(ContractViolation::InvalidValue {
                field: "job_detail.job_category_id",
                reason: "must be > 0",
            });
        }
        validate_iso_date("job_detail.start_date", &self.start_date)?;
        validate_iso_date("job_detail.end_date", &self.end_date)?;
        if self.end_date < self.start_date {
            return Err(ContractViolation::InvalidValue {
                field: "job_detail.end_date",
                reason: "must not precede start_date",
            });
        }
        validate_text("job_detail.work_location", &self.work_location, 256)?;
        if self.work_shifts.is_empty() || self.work_shifts.len() > MAX_WORK_SHIFTS {
            return Err(ContractViolation::InvalidValue {
                field: "job_detail.work_shifts",
                reason: "must contain 1..=16 shifts",
            });
        }
        for shift in &self.work_shifts {
            shift.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDraft {
    pub customer_id: i64,
    pub starting_date: String,
    pub ending_date: String,
    pub total_amount: i64,
    pub address: String,
    pub description: String,
    pub job_details: Vec<JobDetailDraft>,
}

impl ContractDraft {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        customer_id: i64,
        starting_date: String,
        ending_date: String,
        total_amount: i64,
        address: String,
        description: String,
        job_details: Vec<JobDetailDraft>,
    ) -> Result<Self, ContractViolation> {
        let draft = Self {
            customer_id,
            starting_date,
            ending_date,
            total_amount,
            address,
            description,
            job_details,
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl Validate for ContractDraft {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.customer_id < 1 {
            return Err(ContractViolation::InvalidValue {
                field: "contract_draft.customer_id",
                reason: "must be > 0",
            });
        }
        validate_iso_date("contract_draft.starting_date", &self.starting_date)?;
        validate_iso_date("contract_draft.ending_date", &self.ending_date)?;
        // ISO dates order lexicographically, so plain string comparison is the date comparison.
        if self.ending_date < self.starting_date {
            return Err(ContractViolation::InvalidValue {
                field: "contract_draft.ending_date",
                reason: "must not precede starting_date",
            });
        }
        validate_positive_amount("contract_draft.total_amount", self.total_amount, MAX_AMOUNT)?;
        validate_text("contract_draft.address", &self.address, 256)?;
        validate_text("contract_draft.description", &self.description, 512)?;
        if self.job_details.is_empty() || self.job_details.len() > MAX_JOB_DETAILS {
            return Err(ContractViolation::InvalidValue {
                field: "contract_draft.job_details",
                reason: "must contain 1..=32 job details",
            });
        }
        for detail in &self.job_details {
            detail.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub payment_amount: i64,
    pub payment_method: u16,
    pub note: String,
    pub customer_contract_id: i64,
    pub customer_id: i64,
}

impl PaymentDraft {
    pub fn v1(
        payment_amount: i64,
        payment_method: u16,
        note: String,
        customer_contract_id: i64,
        customer_id: i64,
    ) -> Result<Self, ContractViolation> {
        let draft = Self {
            payment_amount,
            payment_method,
            note,
            customer_contract_id,
            customer_id,
        };
        draft.validate()?;
        Ok(draft)
    }
}

impl Validate for PaymentDraft {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_positive_amount(
            "payment_draft.payment_amount",
            self.payment_amount,
            MAX_AMOUNT,
        )?;
        if self.payment_method > MAX_PAYMENT_METHOD {
            return Err(ContractViolation::InvalidRange {
                field: "payment_draft.payment_method",
                min: 0,
                max: i64::from(MAX_PAYMENT_METHOD),
                got: i64::from(self.payment_method),
            });
        }
        validate_text("payment_draft.note", &self.note, 256)?;
        if self.customer_contract_id < 1 {
            return Err(ContractViolation::InvalidValue {
                field: "payment_draft.customer_contract_id",
                reason: "must be > 0",
            });
        }
        if self.customer_id < 1 {
            return Err(ContractViolation::InvalidValue {
                field: "payment_draft.customer_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Audit-time view of a record as the remote store returns it. Key fields
/// stay optional so a missing field surfaces as a malformed record instead
/// of silently conflating business keys.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredContract {
    pub id: i64,
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub total_amount: Option<i64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPayment {
    pub id: i64,
    #[serde(default)]
    pub payment_amount: Option<i64>,
    #[serde(default)]
    pub payment_method: Option<u16>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub customer_contract_id: Option<i64>,
    #[serde(default)]
    pub customer_id: Option<i64>,
}
