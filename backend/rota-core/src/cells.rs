// src/cells.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::continuity::{ContinuityClass, ContinuityEngine};
use crate::error::EngineResult;
use crate::integrity::check_unique_entries;
use crate::models::{Driver, DriverId, RateCard, ScheduleEntry};
use crate::rate_card::RateCardLookup;

/// What the scheduling grid should do with a (driver, day) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellState {
    /// No rate card resolves for the service.
    Locked,
    /// Working this day would sit inside a full consecutive-day run.
    Blocked,
    /// Working this day would start or complete a full run.
    Warning,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellAdvisory {
    pub state: CellState,
    pub continuity: ContinuityClass,
    pub has_rate_card: bool,
    /// Service evaluated: the scheduled one, or the grid default for empty cells.
    pub service: String,
}

pub type CellMap = HashMap<DriverId, BTreeMap<NaiveDate, CellAdvisory>>;

/// Combines rate card resolution and continuity into one state per cell.
///
/// Rate cards are resolved once per (date, service, driver) for the whole grid.
/// Duplicate (driver, day) entries are rejected before anything is computed.
pub fn cell_states(
    engine: &ContinuityEngine,
    drivers: &[Driver],
    schedules: &[ScheduleEntry],
    rate_cards: &[RateCard],
    candidate_dates: &[NaiveDate],
    default_service: &str,
) -> EngineResult<CellMap> {
    check_unique_entries(schedules)?;
    let continuity = engine.compute(drivers, schedules, candidate_dates);
    let scheduled_service: HashMap<(&str, NaiveDate), &str> = schedules
        .iter()
        .map(|s| ((s.driver_id.as_str(), s.day), s.service.as_str()))
        .collect();

    let mut lookup = RateCardLookup::new(rate_cards);
    let mut cells = CellMap::with_capacity(drivers.len());
    for driver in drivers {
        let Some(classes) = continuity.get(&driver.id) else {
            continue;
        };
        let mut row = BTreeMap::new();
        for (&date, &class) in classes {
            let service = scheduled_service
                .get(&(driver.id.as_str(), date))
                .copied()
                .unwrap_or(default_service);
            let has_rate_card = lookup.get(date, service, driver).is_some();
            let state = match (has_rate_card, class) {
                (false, _) => CellState::Locked,
                (true, ContinuityClass::Interior) => CellState::Blocked,
                (true, ContinuityClass::Boundary) => CellState::Warning,
                (true, ContinuityClass::Clear) => CellState::Open,
            };
            row.insert(
                date,
                CellAdvisory {
                    state,
                    continuity: class,
                    has_rate_card,
                    service: service.to_string(),
                },
            );
        }
        cells.insert(driver.id.clone(), row);
    }
    debug!(
        "Cell states for {} drivers, {} rate card lookups",
        cells.len(),
        lookup.resolved_count()
    );
    Ok(cells)
}
