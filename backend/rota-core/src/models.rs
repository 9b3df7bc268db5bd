// src/models.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Core Data Structures ---

pub type DriverId = String;
pub type ScheduleId = String;
pub type VehicleType = String;
pub type ServiceName = String;

/// One recorded change of a driver's vehicle type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeTrace {
    /// Effective day, stored as `D/M/YYYY`.
    pub timestamp: String,
    pub from: VehicleType,
    pub to: VehicleType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    #[serde(default)]
    pub name: Option<String>,
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub type_of_driver_trace: Vec<TypeTrace>,
    /// Manual overrides keyed by `D/M/YYYY`.
    #[serde(default)]
    pub custom_type_of_driver: HashMap<String, VehicleType>,
}

impl Driver {
    pub fn new(id: &str, vehicle_type: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            vehicle_type: vehicle_type.to_string(),
            type_of_driver_trace: Vec::new(),
            custom_type_of_driver: HashMap::new(),
        }
    }

    pub fn trace(mut self, timestamp: &str, from: &str, to: &str) -> Self {
        self.type_of_driver_trace.push(TypeTrace {
            timestamp: timestamp.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    pub fn custom_type(mut self, date_key: &str, vehicle_type: &str) -> Self {
        self.custom_type_of_driver
            .insert(date_key.to_string(), vehicle_type.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: ScheduleId,
    pub driver_id: DriverId,
    pub day: NaiveDate,
    pub service: ServiceName,
    #[serde(default)]
    pub site: String,
    /// ISO-week label, see [`crate::dates::week_label`].
    #[serde(default)]
    pub week: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCard {
    pub service_week: String,
    pub service_title: ServiceName,
    pub vehicle_type: VehicleType,
    pub service_rate: Decimal,
    pub byod_rate: Decimal,
    /// Rate per mile.
    pub mileage: Decimal,
    pub active: bool,
}

/// Additive line item (bonus) for a driver/day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncentiveRecord {
    pub id: String,
    pub driver_id: DriverId,
    pub date: NaiveDate,
    pub rate: Decimal,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub site: String,
    /// Service the incentive is tied to; `None` applies to the main service.
    #[serde(default)]
    pub service: Option<ServiceName>,
}

/// Subtractive line item (e.g. damage, fuel advance) for a driver/day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionRecord {
    pub id: String,
    pub driver_id: DriverId,
    pub date: NaiveDate,
    pub rate: Decimal,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub site: String,
}

/// Everything the engines read, as supplied by the data-access layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    #[serde(default)]
    pub rate_cards: Vec<RateCard>,
    #[serde(default)]
    pub incentives: Vec<IncentiveRecord>,
    #[serde(default)]
    pub deductions: Vec<DeductionRecord>,
}
