// src/error.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::DriverId;

// --- Engine Errors ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Duplicate schedule entry for driver {driver_id} on {day}")]
    DuplicateScheduleEntry { driver_id: DriverId, day: NaiveDate },

    #[error("Miles must not be negative (got {miles})")]
    NegativeMiles { miles: Decimal },

    #[error("Line item rate must not be negative (got {rate} on {item_id})")]
    NegativeRate { item_id: String, rate: Decimal },

    #[error("Only a privileged actor can approve an additional service")]
    ApprovalNotPermitted,

    #[error("No additional service is attached to this invoice")]
    NoAdditionalService,

    #[error("Deduction {deduction_id} is not part of this invoice")]
    UnknownDeduction { deduction_id: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invoice cannot be submitted: {}", format_issues(.issues))]
    SubmissionRejected { issues: Vec<InvoiceIssue> },
}

// Reasons a draft is not (yet) submittable. Collected, not short-circuited.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvoiceIssue {
    #[error("No active rate card resolved for {service} on {day}")]
    MissingRateCard { service: String, day: NaiveDate },

    #[error("Miles have not been entered")]
    MissingMiles,

    #[error("Route Support requires an assigned incentive rate before submission")]
    RouteSupportRateMissing,

    #[error("Total would be negative ({total}); adjust deductions before submitting")]
    NegativeTotal { total: Decimal },
}

fn format_issues(issues: &[InvoiceIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type EngineResult<T> = Result<T, EngineError>;
