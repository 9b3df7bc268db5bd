// src/streaks.rs
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::dates::days_between;
use crate::models::{Driver, DriverId, ScheduleEntry};

/// driver id -> scheduled day -> length of the run ending on that day.
pub type StreakMap = HashMap<DriverId, BTreeMap<NaiveDate, u32>>;

/// Length of the consecutive-day run ending at (and including) each scheduled day.
///
/// Only drivers in `drivers` are evaluated. Unscheduled days have no entry;
/// absence means "not evaluated", not zero.
pub fn compute_streaks(drivers: &[Driver], schedules: &[ScheduleEntry]) -> StreakMap {
    let mut days_by_driver: HashMap<&str, Vec<NaiveDate>> = drivers
        .iter()
        .map(|driver| (driver.id.as_str(), Vec::new()))
        .collect();
    for entry in schedules {
        if let Some(days) = days_by_driver.get_mut(entry.driver_id.as_str()) {
            days.push(entry.day);
        }
    }

    let mut streaks = StreakMap::with_capacity(days_by_driver.len());
    for (driver_id, mut days) in days_by_driver {
        days.sort_unstable();
        let runs = streaks_for_days(&days);
        debug!("Computed {} streak cells for driver {}", runs.len(), driver_id);
        streaks.insert(driver_id.to_string(), runs);
    }
    streaks
}

/// Streaks for one driver's sorted days.
pub fn streaks_for_days(sorted_days: &[NaiveDate]) -> BTreeMap<NaiveDate, u32> {
    let mut runs = BTreeMap::new();
    let mut current_streak = 0u32;
    let mut previous: Option<NaiveDate> = None;

    for &day in sorted_days {
        current_streak = match previous {
            Some(prev) if days_between(prev, day) == 1 => current_streak + 1,
            _ => 1,
        };
        runs.insert(day, current_streak);
        previous = Some(day);
    }
    runs
}

/// Longest streak per driver, handy for summary views.
pub fn longest_streaks(streaks: &StreakMap) -> HashMap<DriverId, u32> {
    streaks
        .iter()
        .map(|(driver_id, runs)| {
            (driver_id.clone(), runs.values().copied().max().unwrap_or(0))
        })
        .collect()
}
