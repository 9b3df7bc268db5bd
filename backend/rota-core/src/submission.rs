// src/submission.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::invoice::{
    AdditionalServiceDetail, ApprovalStatus, DeductionLine, IncentiveLine, InvoiceDraft,
};
use crate::models::{DriverId, ServiceName};

/// Immutable invoice as handed to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedInvoice {
    pub driver_id: DriverId,
    pub date: NaiveDate,
    pub service: ServiceName,
    pub site: String,
    pub week: String,
    #[serde(rename = "serviceRateforMain")]
    pub service_rate_for_main: Decimal,
    pub byod_rate: Decimal,
    pub mileage: Decimal,
    pub miles: Decimal,
    pub calculated_mileage: Decimal,
    #[serde(rename = "incentiveDetailforMain")]
    pub incentive_detail_for_main: Vec<IncentiveLine>,
    /// Checked-in deductions only.
    pub deduction_detail: Vec<DeductionLine>,
    pub additional_service_details: Option<AdditionalServiceDetail>,
    #[serde(rename = "incentiveDetailforAdditional")]
    pub incentive_detail_for_additional: Vec<IncentiveLine>,
    pub additional_service_approval: ApprovalStatus,
    pub total: Decimal,
}

impl InvoiceDraft {
    /// Final recompute and validation. Consumes the draft; nothing is written here.
    pub fn submit(mut self) -> EngineResult<SubmittedInvoice> {
        let issues = self.issues();
        if !issues.is_empty() {
            warn!(
                "Invoice for driver {} on {} rejected: {} issue(s)",
                self.driver_id(),
                self.date(),
                issues.len()
            );
            return Err(EngineError::SubmissionRejected { issues });
        }
        if self.approval_status() == ApprovalStatus::Request {
            self.request_additional_approval()?;
        }

        let total = self.compose_total();
        debug_assert_eq!(total, self.total(), "draft total drifted from its components");

        Ok(SubmittedInvoice {
            driver_id: self.driver_id().to_string(),
            date: self.date(),
            service: self.service().to_string(),
            site: self.site().to_string(),
            week: self.week().to_string(),
            service_rate_for_main: self.service_rate_for_main(),
            byod_rate: self.byod_rate(),
            mileage: self.mileage_rate(),
            miles: self.miles().unwrap_or(Decimal::ZERO),
            calculated_mileage: self.calculated_mileage(),
            incentive_detail_for_main: self.main_incentives().to_vec(),
            deduction_detail: self
                .deductions()
                .iter()
                .filter(|d| d.checked)
                .cloned()
                .collect(),
            additional_service_details: self.additional_service().cloned(),
            incentive_detail_for_additional: self.additional_incentives().to_vec(),
            additional_service_approval: self.approval_status(),
            total,
        })
    }
}

// --- Remote Store Contract ---

/// Write side of the invoice endpoint. One invoice per (driver, day); the last
/// write wins.
pub trait InvoiceStore {
    fn save(&self, invoice: SubmittedInvoice) -> EngineResult<()>;
    fn get(&self, driver_id: &str, date: NaiveDate) -> Option<SubmittedInvoice>;
}

/// In-process store, used by the CLI and tests.
#[derive(Clone, Default)]
pub struct MemoryInvoiceStore {
    invoices: Arc<Mutex<HashMap<(DriverId, NaiveDate), SubmittedInvoice>>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InvoiceStore for MemoryInvoiceStore {
    fn save(&self, invoice: SubmittedInvoice) -> EngineResult<()> {
        let key = (invoice.driver_id.clone(), invoice.date);
        let mut guard = self.invoices.lock().unwrap_or_else(|p| p.into_inner());
        if guard.insert(key, invoice).is_some() {
            info!("Replaced existing invoice (last write wins)");
        }
        Ok(())
    }

    fn get(&self, driver_id: &str, date: NaiveDate) -> Option<SubmittedInvoice> {
        self.invoices
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(driver_id.to_string(), date))
            .cloned()
    }
}
