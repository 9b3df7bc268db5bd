// src/vehicle_type.rs
//! Resolves a driver's vehicle type on an arbitrary day from the manual
//! overrides and the recorded history of type changes.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dates::{parse_trace_date, trace_date_string};
use crate::models::{Driver, TypeTrace, VehicleType};

/// Where a resolved vehicle type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    CustomOverride,
    LatestTrace,
    EarliestTraceFrom,
    Static,
    /// History present but unreadable; static type used instead.
    MalformedHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub vehicle_type: VehicleType,
    pub source: TypeSource,
}

/// Vehicle type effective for `driver` on `date`.
pub fn resolve_vehicle_type(driver: &Driver, date: NaiveDate) -> VehicleType {
    resolve_vehicle_type_detailed(driver, date).vehicle_type
}

pub fn resolve_vehicle_type_detailed(driver: &Driver, date: NaiveDate) -> ResolvedType {
    if let Some(custom) = custom_override(driver, date) {
        debug!("Custom vehicle type for driver {} on {}: {}", driver.id, date, custom);
        return ResolvedType {
            vehicle_type: custom.clone(),
            source: TypeSource::CustomOverride,
        };
    }

    if driver.type_of_driver_trace.is_empty() {
        return ResolvedType {
            vehicle_type: driver.vehicle_type.clone(),
            source: TypeSource::Static,
        };
    }

    let Some(history) = sorted_history(driver) else {
        return ResolvedType {
            vehicle_type: driver.vehicle_type.clone(),
            source: TypeSource::MalformedHistory,
        };
    };

    // Ties on the same day keep array order, so the later record is "latest".
    if let Some((_, trace)) = history.iter().rev().find(|(day, _)| *day <= date) {
        return ResolvedType {
            vehicle_type: trace.to.clone(),
            source: TypeSource::LatestTrace,
        };
    }

    // history is non-empty here
    let (_, earliest) = history[0];
    ResolvedType {
        vehicle_type: earliest.from.clone(),
        source: TypeSource::EarliestTraceFrom,
    }
}

/// Override keyed by `date`. Keys are compared as days, so `5/1/2024` and
/// `05/01/2024` both match.
fn custom_override(driver: &Driver, date: NaiveDate) -> Option<&VehicleType> {
    if let Some(exact) = driver.custom_type_of_driver.get(&trace_date_string(date)) {
        return Some(exact);
    }
    let mut found = None;
    for (key, value) in &driver.custom_type_of_driver {
        match parse_trace_date(key) {
            Some(day) if day == date => {
                found = Some(value);
                break;
            }
            Some(_) => {}
            None => warn!(
                "Ignoring custom vehicle type with unreadable date key {:?} for driver {}",
                key, driver.id
            ),
        }
    }
    found
}

/// History sorted by effective day with array order as the secondary key.
/// `None` when any timestamp cannot be read.
fn sorted_history(driver: &Driver) -> Option<Vec<(NaiveDate, &TypeTrace)>> {
    let mut history = Vec::with_capacity(driver.type_of_driver_trace.len());
    for trace in &driver.type_of_driver_trace {
        match parse_trace_date(&trace.timestamp) {
            Some(day) => history.push((day, trace)),
            None => {
                warn!(
                    "Malformed type trace timestamp {:?} for driver {}; falling back to static vehicle type {}",
                    trace.timestamp, driver.id, driver.vehicle_type
                );
                return None;
            }
        }
    }
    // stable sort
    history.sort_by_key(|(day, _)| *day);
    Some(history)
}
