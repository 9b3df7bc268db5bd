// src/integrity.rs
use std::collections::HashSet;
use tracing::error;

use crate::error::{EngineError, EngineResult};
use crate::models::ScheduleEntry;

/// Rejects schedules with more than one entry for the same (driver, day).
///
/// Streak and continuity results are only meaningful once this holds.
pub fn check_unique_entries(schedules: &[ScheduleEntry]) -> EngineResult<()> {
    let mut seen = HashSet::with_capacity(schedules.len());
    for entry in schedules {
        if !seen.insert((entry.driver_id.as_str(), entry.day)) {
            error!(
                "Duplicate schedule entry {} for driver {} on {}",
                entry.id, entry.driver_id, entry.day
            );
            return Err(EngineError::DuplicateScheduleEntry {
                driver_id: entry.driver_id.clone(),
                day: entry.day,
            });
        }
    }
    Ok(())
}
