// src/invoice.rs
//! Daily invoice composition for one driver/day.
//!
//! An [`InvoiceDraft`] is only ever changed through its methods, and every
//! method re-derives `calculated_mileage` and `total` from the component
//! values before returning, so a draft never carries a stale total.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, InvoiceIssue};
use crate::models::{DeductionRecord, DriverId, IncentiveRecord, RateCard, ScheduleEntry, ServiceName};

pub const ROUTE_SUPPORT_SERVICE: &str = "Route Support";

/// Rounds money to pence, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// --- Draft Building Blocks ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    #[default]
    #[serde(rename = "")]
    NotRequested,
    Request,
    Requested,
    Approved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActorRole {
    #[default]
    Standard,
    /// Admin-level user; additional-service edits apply immediately.
    Privileged,
}

impl ActorRole {
    pub fn is_privileged(self) -> bool {
        self == ActorRole::Privileged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalServiceDetail {
    pub service: ServiceName,
    pub service_rate: Decimal,
    pub byod_rate: Decimal,
    /// Rate per mile.
    pub mileage: Decimal,
    #[serde(default)]
    pub miles: Decimal,
}

impl AdditionalServiceDetail {
    pub fn from_rate_card(card: &RateCard, miles: Decimal) -> Self {
        Self {
            service: card.service_title.clone(),
            service_rate: card.service_rate,
            byod_rate: card.byod_rate,
            mileage: card.mileage,
            miles,
        }
    }

    /// Service + BYOD + mileage, rounded.
    pub fn base_amount(&self) -> Decimal {
        round2(self.service_rate + self.byod_rate + self.miles * self.mileage)
    }

    fn validate(&self) -> EngineResult<()> {
        if self.miles < Decimal::ZERO {
            return Err(EngineError::NegativeMiles { miles: self.miles });
        }
        for (name, rate) in [
            ("serviceRate", self.service_rate),
            ("byodRate", self.byod_rate),
            ("mileage", self.mileage),
        ] {
            if rate < Decimal::ZERO {
                return Err(EngineError::NegativeRate {
                    item_id: format!("{}.{}", self.service, name),
                    rate,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncentiveLine {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub rate: Decimal,
}

impl From<&IncentiveRecord> for IncentiveLine {
    fn from(record: &IncentiveRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind.clone(),
            rate: record.rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionLine {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub rate: Decimal,
    /// Only checked-in deductions reduce the total.
    pub checked: bool,
}

impl From<&DeductionRecord> for DeductionLine {
    fn from(record: &DeductionRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind.clone(),
            rate: record.rate,
            checked: true,
        }
    }
}

fn ensure_non_negative(item_id: &str, rate: Decimal) -> EngineResult<()> {
    if rate < Decimal::ZERO {
        warn!("Rejected negative rate {} for line item {}", rate, item_id);
        return Err(EngineError::NegativeRate {
            item_id: item_id.to_string(),
            rate,
        });
    }
    Ok(())
}

// --- Invoice Draft ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    driver_id: DriverId,
    date: NaiveDate,
    service: ServiceName,
    site: String,
    week: String,
    #[serde(skip)]
    actor: ActorRole,
    route_support: bool,
    rate_card_resolved: bool,
    #[serde(rename = "serviceRateforMain")]
    service_rate_for_main: Decimal,
    byod_rate: Decimal,
    mileage: Decimal,
    miles: Option<Decimal>,
    calculated_mileage: Decimal,
    #[serde(rename = "incentiveDetailforMain")]
    incentive_detail_for_main: Vec<IncentiveLine>,
    deduction_detail: Vec<DeductionLine>,
    additional_service_details: Option<AdditionalServiceDetail>,
    /// Last approved version of the additional service, used while a change is pending.
    #[serde(skip)]
    approved_additional: Option<AdditionalServiceDetail>,
    #[serde(skip)]
    approved_additional_incentives: Vec<IncentiveLine>,
    #[serde(rename = "incentiveDetailforAdditional")]
    incentive_detail_for_additional: Vec<IncentiveLine>,
    additional_service_approval: ApprovalStatus,
    total: Decimal,
}

impl InvoiceDraft {
    /// Opens a draft for a schedule cell. `rate_card` is the resolved card, if any.
    pub fn new(
        entry: &ScheduleEntry,
        rate_card: Option<&RateCard>,
        actor: ActorRole,
        config: &EngineConfig,
    ) -> Self {
        let mut draft = Self {
            driver_id: entry.driver_id.clone(),
            date: entry.day,
            service: entry.service.clone(),
            site: entry.site.clone(),
            week: entry.week.clone(),
            actor,
            route_support: entry.service == config.route_support_service,
            rate_card_resolved: false,
            service_rate_for_main: Decimal::ZERO,
            byod_rate: Decimal::ZERO,
            mileage: Decimal::ZERO,
            miles: None,
            calculated_mileage: Decimal::ZERO,
            incentive_detail_for_main: Vec::new(),
            deduction_detail: Vec::new(),
            additional_service_details: None,
            approved_additional: None,
            approved_additional_incentives: Vec::new(),
            incentive_detail_for_additional: Vec::new(),
            additional_service_approval: ApprovalStatus::NotRequested,
            total: Decimal::ZERO,
        };
        draft.apply_rate_card(rate_card);
        draft.recompute();
        draft
    }

    /// Opens a draft and attaches the driver's incentives and deductions for the day.
    ///
    /// Incentives tied to another service are left out; deductions start checked in.
    /// A matching record with a negative rate rejects the whole draft.
    pub fn for_entry(
        entry: &ScheduleEntry,
        rate_card: Option<&RateCard>,
        incentives: &[IncentiveRecord],
        deductions: &[DeductionRecord],
        actor: ActorRole,
        config: &EngineConfig,
    ) -> EngineResult<Self> {
        let mut draft = Self::new(entry, rate_card, actor, config);
        let same_site = |site: &str| site.is_empty() || entry.site.is_empty() || site == entry.site;

        for record in incentives
            .iter()
            .filter(|i| i.driver_id == entry.driver_id && i.date == entry.day && same_site(&i.site))
            .filter(|i| i.service.as_deref().map_or(true, |s| s == entry.service))
        {
            ensure_non_negative(&record.id, record.rate)?;
            draft.incentive_detail_for_main.push(IncentiveLine::from(record));
        }
        for record in deductions
            .iter()
            .filter(|d| d.driver_id == entry.driver_id && d.date == entry.day && same_site(&d.site))
        {
            ensure_non_negative(&record.id, record.rate)?;
            draft.deduction_detail.push(DeductionLine::from(record));
        }

        debug!(
            "Draft for driver {} on {}: {} incentives, {} deductions",
            draft.driver_id,
            draft.date,
            draft.incentive_detail_for_main.len(),
            draft.deduction_detail.len()
        );
        draft.recompute();
        Ok(draft)
    }

    fn apply_rate_card(&mut self, rate_card: Option<&RateCard>) {
        self.rate_card_resolved = rate_card.is_some();
        let (service_rate, byod_rate, mileage) = match rate_card {
            Some(card) => (card.service_rate, card.byod_rate, card.mileage),
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };
        self.mileage = mileage;
        if self.route_support {
            self.service_rate_for_main = Decimal::ZERO;
            self.byod_rate = Decimal::ZERO;
        } else {
            self.service_rate_for_main = service_rate;
            self.byod_rate = byod_rate;
        }
    }

    // --- Composition ---

    /// Total derived from the current components. Pure and idempotent.
    pub fn compose_total(&self) -> Decimal {
        let incentives = self.main_incentive_total();
        let deductions = self.deduction_total();
        if self.route_support {
            return round2(incentives - deductions);
        }
        round2(
            self.service_rate_for_main
                + self.byod_rate
                + self.mileage_cost()
                + self.additional_total()
                + incentives
                - deductions,
        )
    }

    fn mileage_cost(&self) -> Decimal {
        if self.route_support {
            return Decimal::ZERO;
        }
        self.miles
            .map(|miles| round2(miles * self.mileage))
            .unwrap_or(Decimal::ZERO)
    }

    fn recompute(&mut self) {
        self.calculated_mileage = self.mileage_cost();
        let total = self.compose_total();
        if total != self.total {
            debug!(
                "Invoice total for driver {} on {}: {} -> {}",
                self.driver_id, self.date, self.total, total
            );
        }
        self.total = total;
    }

    pub fn main_incentive_total(&self) -> Decimal {
        self.incentive_detail_for_main.iter().map(|i| i.rate).sum()
    }

    pub fn deduction_total(&self) -> Decimal {
        self.deduction_detail
            .iter()
            .filter(|d| d.checked)
            .map(|d| d.rate)
            .sum()
    }

    /// Additional-service amount as if the current details were approved.
    pub fn additional_total_if_approved(&self) -> Decimal {
        match &self.additional_service_details {
            Some(detail) => detail.base_amount() + self.additional_incentive_total(),
            None => Decimal::ZERO,
        }
    }

    /// Whether the current additional-service details count towards the total.
    pub fn additional_counts(&self) -> bool {
        self.additional_service_details.is_some()
            && (self.additional_service_approval == ApprovalStatus::Approved
                || self.actor.is_privileged())
    }

    /// Additional-service amount that actually enters the total.
    ///
    /// While a non-privileged change awaits approval, the last approved
    /// version (if any) keeps counting instead.
    pub fn additional_total(&self) -> Decimal {
        if self.additional_counts() {
            return self.additional_total_if_approved();
        }
        match &self.approved_additional {
            Some(approved) => {
                approved.base_amount()
                    + self
                        .approved_additional_incentives
                        .iter()
                        .map(|i| i.rate)
                        .sum::<Decimal>()
            }
            None => Decimal::ZERO,
        }
    }

    fn additional_incentive_total(&self) -> Decimal {
        self.incentive_detail_for_additional.iter().map(|i| i.rate).sum()
    }

    /// Records the current additional service and its incentives as approved.
    fn mark_additional_approved(&mut self) {
        self.approved_additional = self.additional_service_details.clone();
        self.approved_additional_incentives = self.incentive_detail_for_additional.clone();
        self.additional_service_approval = ApprovalStatus::Approved;
    }

    // --- Mutations (each ends with a full recompute) ---

    /// Re-resolves the main service rates, e.g. after a vehicle-type change.
    pub fn set_rate_card(&mut self, rate_card: Option<&RateCard>) {
        self.apply_rate_card(rate_card);
        self.recompute();
    }

    pub fn set_miles(&mut self, miles: Decimal) -> EngineResult<()> {
        if miles < Decimal::ZERO {
            warn!(
                "Rejected negative miles {} for driver {} on {}",
                miles, self.driver_id, self.date
            );
            return Err(EngineError::NegativeMiles { miles });
        }
        self.miles = Some(miles);
        self.recompute();
        Ok(())
    }

    pub fn clear_miles(&mut self) {
        self.miles = None;
        self.recompute();
    }

    pub fn add_main_incentive(&mut self, line: IncentiveLine) -> EngineResult<()> {
        ensure_non_negative(&line.id, line.rate)?;
        self.incentive_detail_for_main.push(line);
        self.recompute();
        Ok(())
    }

    pub fn remove_main_incentive(&mut self, id: &str) -> bool {
        let before = self.incentive_detail_for_main.len();
        self.incentive_detail_for_main.retain(|i| i.id != id);
        let removed = self.incentive_detail_for_main.len() != before;
        self.recompute();
        removed
    }

    pub fn add_deduction(&mut self, line: DeductionLine) -> EngineResult<()> {
        ensure_non_negative(&line.id, line.rate)?;
        self.deduction_detail.push(line);
        self.recompute();
        Ok(())
    }

    /// Checks a deduction in to (or out of) the invoice.
    pub fn set_deduction_checked(&mut self, id: &str, checked: bool) -> EngineResult<()> {
        let line = self
            .deduction_detail
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| EngineError::UnknownDeduction {
                deduction_id: id.to_string(),
            })?;
        line.checked = checked;
        self.recompute();
        Ok(())
    }

    pub fn toggle_deduction(&mut self, id: &str) -> EngineResult<bool> {
        let checked = self
            .deduction_detail
            .iter()
            .find(|d| d.id == id)
            .map(|d| !d.checked)
            .ok_or_else(|| EngineError::UnknownDeduction {
                deduction_id: id.to_string(),
            })?;
        self.set_deduction_checked(id, checked)?;
        Ok(checked)
    }

    /// Selects or edits the additional service.
    ///
    /// A privileged actor's edit is approved immediately; anyone else's edit
    /// waits for approval and leaves the total unchanged until then.
    pub fn set_additional_service(&mut self, detail: AdditionalServiceDetail) -> EngineResult<()> {
        detail.validate()?;
        let service = detail.service.clone();
        self.additional_service_details = Some(detail);
        if self.actor.is_privileged() {
            self.mark_additional_approved();
        } else {
            self.additional_service_approval = ApprovalStatus::Request;
        }
        info!(
            "Additional service {} set for driver {} on {} (status {:?})",
            service, self.driver_id, self.date, self.additional_service_approval
        );
        self.recompute();
        Ok(())
    }

    pub fn set_additional_miles(&mut self, miles: Decimal) -> EngineResult<()> {
        let mut detail = self
            .additional_service_details
            .clone()
            .ok_or(EngineError::NoAdditionalService)?;
        detail.miles = miles;
        self.set_additional_service(detail)
    }

    /// Same approval rules as [`Self::set_additional_service`].
    pub fn add_additional_incentive(&mut self, line: IncentiveLine) -> EngineResult<()> {
        if self.additional_service_details.is_none() {
            return Err(EngineError::NoAdditionalService);
        }
        ensure_non_negative(&line.id, line.rate)?;
        self.incentive_detail_for_additional.push(line);
        if self.actor.is_privileged() {
            self.mark_additional_approved();
        } else {
            self.additional_service_approval = ApprovalStatus::Request;
        }
        self.recompute();
        Ok(())
    }

    /// Drops the additional service. Removing an approved one needs privilege.
    pub fn remove_additional_service(&mut self) -> EngineResult<()> {
        if self.approved_additional.is_some() && !self.actor.is_privileged() {
            return Err(EngineError::ApprovalNotPermitted);
        }
        self.additional_service_details = None;
        self.approved_additional = None;
        self.approved_additional_incentives.clear();
        self.incentive_detail_for_additional.clear();
        self.additional_service_approval = ApprovalStatus::NotRequested;
        self.recompute();
        Ok(())
    }

    /// Marks a pending request as sent for approval.
    pub fn request_additional_approval(&mut self) -> EngineResult<()> {
        if self.additional_service_details.is_none() {
            return Err(EngineError::NoAdditionalService);
        }
        if self.additional_service_approval == ApprovalStatus::Request {
            self.additional_service_approval = ApprovalStatus::Requested;
        }
        self.recompute();
        Ok(())
    }

    pub fn approve_additional_service(&mut self) -> EngineResult<()> {
        if !self.actor.is_privileged() {
            return Err(EngineError::ApprovalNotPermitted);
        }
        if self.additional_service_details.is_none() {
            return Err(EngineError::NoAdditionalService);
        }
        self.mark_additional_approved();
        info!(
            "Additional service approved for driver {} on {}",
            self.driver_id, self.date
        );
        self.recompute();
        Ok(())
    }

    // --- Validation ---

    /// Everything that currently blocks submission.
    pub fn issues(&self) -> Vec<InvoiceIssue> {
        let mut issues = Vec::new();
        if self.route_support {
            if self.incentive_detail_for_main.is_empty() {
                issues.push(InvoiceIssue::RouteSupportRateMissing);
            }
        } else {
            if !self.rate_card_resolved {
                issues.push(InvoiceIssue::MissingRateCard {
                    service: self.service.clone(),
                    day: self.date,
                });
            }
            if self.miles.is_none() {
                issues.push(InvoiceIssue::MissingMiles);
            }
        }
        let total = self.compose_total();
        if total < Decimal::ZERO {
            issues.push(InvoiceIssue::NegativeTotal { total });
        }
        issues
    }

    pub fn is_submittable(&self) -> bool {
        self.issues().is_empty()
    }

    // --- Accessors ---

    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn week(&self) -> &str {
        &self.week
    }

    pub fn actor(&self) -> ActorRole {
        self.actor
    }

    pub fn is_route_support(&self) -> bool {
        self.route_support
    }

    pub fn has_rate_card(&self) -> bool {
        self.rate_card_resolved
    }

    pub fn service_rate_for_main(&self) -> Decimal {
        self.service_rate_for_main
    }

    pub fn byod_rate(&self) -> Decimal {
        self.byod_rate
    }

    pub fn mileage_rate(&self) -> Decimal {
        self.mileage
    }

    pub fn miles(&self) -> Option<Decimal> {
        self.miles
    }

    pub fn calculated_mileage(&self) -> Decimal {
        self.calculated_mileage
    }

    pub fn main_incentives(&self) -> &[IncentiveLine] {
        &self.incentive_detail_for_main
    }

    pub fn deductions(&self) -> &[DeductionLine] {
        &self.deduction_detail
    }

    pub fn additional_service(&self) -> Option<&AdditionalServiceDetail> {
        self.additional_service_details.as_ref()
    }

    pub fn additional_incentives(&self) -> &[IncentiveLine] {
        &self.incentive_detail_for_additional
    }

    pub fn approval_status(&self) -> ApprovalStatus {
        self.additional_service_approval
    }

    pub fn total(&self) -> Decimal {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn entry(service: &str) -> ScheduleEntry {
        ScheduleEntry {
            id: "S1".to_string(),
            driver_id: "D1".to_string(),
            day: d("2024-03-05"),
            service: service.to_string(),
            site: "DBS2".to_string(),
            week: "2024-W10".to_string(),
        }
    }

    fn card() -> RateCard {
        RateCard {
            service_week: "2024-W10".to_string(),
            service_title: "Standard Parcel".to_string(),
            vehicle_type: "Van".to_string(),
            service_rate: dec!(120.00),
            byod_rate: dec!(15.50),
            mileage: dec!(0.185),
            active: true,
        }
    }

    fn incentive(id: &str, rate: Decimal) -> IncentiveLine {
        IncentiveLine {
            id: id.to_string(),
            kind: Some("Peak".to_string()),
            rate,
        }
    }

    fn deduction(id: &str, rate: Decimal) -> DeductionLine {
        DeductionLine {
            id: id.to_string(),
            kind: Some("Damage".to_string()),
            rate,
            checked: true,
        }
    }

    fn extra() -> AdditionalServiceDetail {
        AdditionalServiceDetail {
            service: "Sweeper".to_string(),
            service_rate: dec!(40),
            byod_rate: dec!(5),
            mileage: dec!(0.2),
            miles: dec!(10),
        }
    }

    fn draft(actor: ActorRole) -> InvoiceDraft {
        let card = card();
        InvoiceDraft::new(&entry("Standard Parcel"), Some(&card), actor, &EngineConfig::default())
    }

    #[test]
    fn mileage_is_rounded_before_summing() {
        let mut draft = draft(ActorRole::Standard);
        draft.set_miles(dec!(87)).expect("non-negative miles");
        // 87 * 0.185 = 16.095 -> 16.10
        assert_eq!(draft.calculated_mileage(), dec!(16.10));
        assert_eq!(draft.total(), dec!(151.60));
    }

    #[test]
    fn incentives_add_and_checked_deductions_subtract() {
        let mut draft = draft(ActorRole::Standard);
        draft.set_miles(dec!(0)).expect("non-negative miles");
        draft.add_main_incentive(incentive("I1", dec!(10))).expect("valid");
        draft.add_deduction(deduction("X1", dec!(25.25))).expect("valid");
        assert_eq!(draft.total(), dec!(120.25));

        assert_eq!(draft.toggle_deduction("X1"), Ok(false));
        assert_eq!(draft.total(), dec!(145.50));
        assert!(draft.set_deduction_checked("nope", true).is_err());
    }

    #[test]
    fn negative_miles_are_rejected_without_touching_the_draft() {
        let mut draft = draft(ActorRole::Standard);
        draft.set_miles(dec!(10)).expect("non-negative miles");
        let before = draft.clone();
        assert_eq!(draft.set_miles(dec!(-1)), Err(EngineError::NegativeMiles { miles: dec!(-1) }));
        assert_eq!(draft, before);
    }

    #[test]
    fn standard_actor_additional_service_waits_for_approval() {
        let mut draft = draft(ActorRole::Standard);
        draft.set_miles(dec!(0)).expect("non-negative miles");
        draft.set_additional_service(extra()).expect("valid detail");

        assert_eq!(draft.approval_status(), ApprovalStatus::Request);
        assert!(!draft.additional_counts());
        assert_eq!(draft.additional_total_if_approved(), dec!(47));
        assert_eq!(draft.total(), dec!(135.50));

        draft.request_additional_approval().expect("has additional service");
        assert_eq!(draft.approval_status(), ApprovalStatus::Requested);
        assert_eq!(draft.approve_additional_service(), Err(EngineError::ApprovalNotPermitted));
        assert_eq!(draft.total(), dec!(135.50));
    }

    #[test]
    fn privileged_actor_edits_apply_immediately() {
        let mut draft = draft(ActorRole::Privileged);
        draft.set_miles(dec!(0)).expect("non-negative miles");
        draft.set_additional_service(extra()).expect("valid detail");
        assert_eq!(draft.approval_status(), ApprovalStatus::Approved);
        // 40 + 5 + 10 * 0.2 = 47
        assert_eq!(draft.total(), dec!(182.50));

        draft.add_additional_incentive(incentive("IA", dec!(3))).expect("valid");
        assert_eq!(draft.total(), dec!(185.50));
        draft.remove_additional_service().expect("privileged removal");
        assert_eq!(draft.total(), dec!(135.50));
        assert_eq!(draft.approval_status(), ApprovalStatus::NotRequested);
    }

    #[test]
    fn pending_change_keeps_last_approved_amount() {
        let card = card();
        let config = EngineConfig::default();
        let mut admin = InvoiceDraft::new(&entry("Standard Parcel"), Some(&card), ActorRole::Privileged, &config);
        admin.set_miles(dec!(0)).expect("non-negative miles");
        admin.set_additional_service(extra()).expect("valid detail");

        // Same draft handed to a standard user session
        let mut driver = admin.clone();
        driver.actor = ActorRole::Standard;
        driver.set_additional_miles(dec!(50)).expect("valid miles");
        assert_eq!(driver.approval_status(), ApprovalStatus::Request);
        assert_eq!(driver.total(), dec!(182.50));
        assert_eq!(driver.remove_additional_service(), Err(EngineError::ApprovalNotPermitted));
    }

    #[test]
    fn standard_actor_incentive_after_approval_waits_for_approval() {
        let card = card();
        let config = EngineConfig::default();
        let mut admin = InvoiceDraft::new(&entry("Standard Parcel"), Some(&card), ActorRole::Privileged, &config);
        admin.set_miles(dec!(0)).expect("non-negative miles");
        admin.set_additional_service(extra()).expect("valid detail");
        assert_eq!(admin.total(), dec!(182.50));

        let mut driver = admin.clone();
        driver.actor = ActorRole::Standard;
        driver.add_additional_incentive(incentive("IA", dec!(500))).expect("valid");
        assert_eq!(driver.approval_status(), ApprovalStatus::Request);
        assert!(!driver.additional_counts());
        assert_eq!(driver.total(), dec!(182.50));
        assert_eq!(driver.additional_total_if_approved(), dec!(547));

        // Approval brings the incentive in
        driver.actor = ActorRole::Privileged;
        driver.approve_additional_service().expect("privileged approval");
        assert_eq!(driver.total(), dec!(682.50));
    }

    #[test]
    fn pending_incentives_never_join_the_approved_amount() {
        let card = card();
        let config = EngineConfig::default();
        let mut admin = InvoiceDraft::new(&entry("Standard Parcel"), Some(&card), ActorRole::Privileged, &config);
        admin.set_miles(dec!(0)).expect("non-negative miles");
        admin.set_additional_service(extra()).expect("valid detail");
        admin.add_additional_incentive(incentive("IA", dec!(3))).expect("valid");
        assert_eq!(admin.total(), dec!(185.50));

        let mut driver = admin.clone();
        driver.actor = ActorRole::Standard;
        driver.set_additional_miles(dec!(50)).expect("valid miles");
        driver.add_additional_incentive(incentive("IB", dec!(20))).expect("valid");
        // Last approved: 47 + 3
        assert_eq!(driver.total(), dec!(185.50));
    }

    #[test]
    fn negative_records_reject_the_draft() {
        let card = card();
        let config = EngineConfig::default();
        let deductions = vec![DeductionRecord {
            id: "X1".to_string(),
            driver_id: "D1".to_string(),
            date: d("2024-03-05"),
            rate: dec!(-25),
            kind: None,
            site: "DBS2".to_string(),
        }];
        let result = InvoiceDraft::for_entry(
            &entry("Standard Parcel"),
            Some(&card),
            &[],
            &deductions,
            ActorRole::Standard,
            &config,
        );
        assert_eq!(
            result,
            Err(EngineError::NegativeRate {
                item_id: "X1".to_string(),
                rate: dec!(-25),
            })
        );

        let incentives = vec![IncentiveRecord {
            id: "I1".to_string(),
            driver_id: "D1".to_string(),
            date: d("2024-03-05"),
            rate: dec!(-5),
            kind: None,
            site: "DBS2".to_string(),
            service: None,
        }];
        let result = InvoiceDraft::for_entry(
            &entry("Standard Parcel"),
            Some(&card),
            &incentives,
            &[],
            ActorRole::Standard,
            &config,
        );
        assert!(matches!(result, Err(EngineError::NegativeRate { .. })));

        // A negative record for another day does not matter
        let mut other_day = deductions.clone();
        other_day[0].date = d("2024-03-06");
        let draft = InvoiceDraft::for_entry(
            &entry("Standard Parcel"),
            Some(&card),
            &[],
            &other_day,
            ActorRole::Standard,
            &config,
        )
        .expect("nothing negative on this day");
        assert!(draft.deductions().is_empty());
    }

    #[test]
    fn route_support_is_driven_by_incentives_only() {
        let card = card();
        let mut draft = InvoiceDraft::new(
            &entry(ROUTE_SUPPORT_SERVICE),
            Some(&card),
            ActorRole::Standard,
            &EngineConfig::default(),
        );
        assert!(draft.is_route_support());
        assert_eq!(draft.service_rate_for_main(), Decimal::ZERO);
        assert_eq!(draft.issues(), vec![InvoiceIssue::RouteSupportRateMissing]);

        draft.set_miles(dec!(30)).expect("non-negative miles");
        assert_eq!(draft.calculated_mileage(), Decimal::ZERO);
        draft.add_main_incentive(incentive("RS", dec!(50))).expect("valid");
        assert_eq!(draft.total(), dec!(50));
        assert!(draft.is_submittable());
    }

    #[test]
    fn missing_card_and_miles_block_submission() {
        let draft = InvoiceDraft::new(
            &entry("Standard Parcel"),
            None,
            ActorRole::Standard,
            &EngineConfig::default(),
        );
        let issues = draft.issues();
        assert!(issues.contains(&InvoiceIssue::MissingMiles));
        assert!(issues.iter().any(|i| matches!(i, InvoiceIssue::MissingRateCard { .. })));
        assert_eq!(draft.total(), Decimal::ZERO);
    }

    #[test]
    fn negative_total_is_flagged_not_clamped() {
        let mut draft = draft(ActorRole::Standard);
        draft.set_miles(dec!(0)).expect("non-negative miles");
        draft.add_deduction(deduction("X1", dec!(200))).expect("valid");
        assert_eq!(draft.total(), dec!(-64.50));
        assert_eq!(
            draft.issues(),
            vec![InvoiceIssue::NegativeTotal { total: dec!(-64.50) }]
        );
    }

    #[test]
    fn zero_rate_card_still_counts_as_resolved() {
        let mut free = card();
        free.service_rate = Decimal::ZERO;
        free.byod_rate = Decimal::ZERO;
        let mut draft = InvoiceDraft::new(&entry("Standard Parcel"), Some(&free), ActorRole::Standard, &EngineConfig::default());
        draft.set_miles(dec!(0)).expect("non-negative miles");
        assert!(draft.has_rate_card());
        assert!(draft.is_submittable());
        assert_eq!(draft.total(), Decimal::ZERO);
    }

    #[test]
    fn negative_line_items_are_rejected() {
        let mut draft = draft(ActorRole::Standard);
        assert!(draft.add_main_incentive(incentive("I1", dec!(-5))).is_err());
        assert!(draft.add_deduction(deduction("X1", dec!(-5))).is_err());
        assert!(draft.add_additional_incentive(incentive("IA", dec!(1))).is_err());
    }

    #[test]
    fn draft_serializes_with_dashboard_field_names() {
        let mut draft = draft(ActorRole::Standard);
        draft.set_miles(dec!(1)).expect("non-negative miles");
        let json = serde_json::to_value(&draft).expect("serializes");
        assert!(json.get("serviceRateforMain").is_some());
        assert!(json.get("incentiveDetailforMain").is_some());
        assert_eq!(json["additionalServiceApproval"], "");
        assert!(json.get("actor").is_none());
    }
}
