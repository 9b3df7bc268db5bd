// src/continuity.rs
//! Rest-day checks: would working a candidate day put a driver inside a run of
//! `run_length` (default 7) consecutive working days?
//!
//! The candidate is simulated into the driver's schedule window without
//! touching the real schedule, and every candidate is evaluated on its own.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::dates::days_between;
use crate::error::{EngineError, EngineResult};
use crate::models::{Driver, DriverId, ScheduleEntry};

pub const DEFAULT_MAX_CONSECUTIVE_DAYS: u32 = 7;

/// Classification of a candidate day. Serialized as the dashboard's `"1"`/`"2"`/`"3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContinuityClass {
    /// First or last day of a full-length run.
    #[serde(rename = "1")]
    Boundary,
    /// Inside a full-length run.
    #[serde(rename = "2")]
    Interior,
    /// No full-length run through the candidate.
    #[serde(rename = "3")]
    Clear,
}

impl ContinuityClass {
    pub fn code(self) -> &'static str {
        match self {
            ContinuityClass::Boundary => "1",
            ContinuityClass::Interior => "2",
            ContinuityClass::Clear => "3",
        }
    }
}

pub type ContinuityMap = HashMap<DriverId, BTreeMap<NaiveDate, ContinuityClass>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuityEngine {
    run_length: u32,
}

impl Default for ContinuityEngine {
    fn default() -> Self {
        Self {
            run_length: DEFAULT_MAX_CONSECUTIVE_DAYS,
        }
    }
}

impl ContinuityEngine {
    pub fn new(run_length: u32) -> EngineResult<Self> {
        if run_length < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "consecutive-day run length must be at least 2, got {}",
                run_length
            )));
        }
        Ok(Self { run_length })
    }

    pub fn run_length(&self) -> u32 {
        self.run_length
    }

    /// Classifies every (driver, candidate) pair.
    pub fn compute(
        &self,
        drivers: &[Driver],
        schedules: &[ScheduleEntry],
        candidate_dates: &[NaiveDate],
    ) -> ContinuityMap {
        let mut days_by_driver: HashMap<&str, BTreeSet<NaiveDate>> = drivers
            .iter()
            .map(|driver| (driver.id.as_str(), BTreeSet::new()))
            .collect();
        for entry in schedules {
            if let Some(days) = days_by_driver.get_mut(entry.driver_id.as_str()) {
                days.insert(entry.day);
            }
        }

        let mut result = ContinuityMap::with_capacity(days_by_driver.len());
        for (driver_id, scheduled) in days_by_driver {
            let classes: BTreeMap<NaiveDate, ContinuityClass> = candidate_dates
                .iter()
                .map(|&candidate| (candidate, self.classify(&scheduled, candidate)))
                .collect();
            debug!(
                "Continuity for driver {}: {} candidates, {} flagged",
                driver_id,
                classes.len(),
                classes.values().filter(|c| **c != ContinuityClass::Clear).count()
            );
            result.insert(driver_id.to_string(), classes);
        }
        result
    }

    /// Classifies one candidate against a driver's scheduled days.
    pub fn classify(&self, scheduled: &BTreeSet<NaiveDate>, candidate: NaiveDate) -> ContinuityClass {
        let radius = Duration::days(i64::from(self.run_length) - 1);
        let window_start = candidate.checked_sub_signed(radius).unwrap_or(NaiveDate::MIN);
        let window_end = candidate.checked_add_signed(radius).unwrap_or(NaiveDate::MAX);

        let mut window: Vec<NaiveDate> = scheduled.range(window_start..=window_end).copied().collect();
        if let Err(pos) = window.binary_search(&candidate) {
            window.insert(pos, candidate);
        }

        let run_length = self.run_length as usize;
        let mut run_start = 0usize;
        for i in 0..window.len() {
            if i > 0 && days_between(window[i - 1], window[i]) != 1 {
                run_start = i;
            }
            let run = &window[run_start..=i];
            if run.len() < run_length {
                continue;
            }
            if let Some(position) = run.iter().position(|day| *day == candidate) {
                return if position == 0 || position == run_length - 1 {
                    ContinuityClass::Boundary
                } else {
                    ContinuityClass::Interior
                };
            }
        }
        ContinuityClass::Clear
    }
}

/// [`ContinuityEngine::compute`] with the default 7-day run.
pub fn compute_continuity(
    drivers: &[Driver],
    schedules: &[ScheduleEntry],
    candidate_dates: &[NaiveDate],
) -> ContinuityMap {
    ContinuityEngine::default().compute(drivers, schedules, candidate_dates)
}
