// src/rate_card.rs
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::dates::week_label;
use crate::models::{Driver, DriverId, RateCard, ServiceName};
use crate::vehicle_type::resolve_vehicle_type;

/// Finds the active rate card for (`week`, `service`, driver's vehicle type on `date`).
///
/// `None` means no card applies, which is not the same as a card with zero rates.
pub fn find_rate_card<'a>(
    date: NaiveDate,
    rate_cards: &'a [RateCard],
    week: &str,
    service: &str,
    driver: &Driver,
) -> Option<&'a RateCard> {
    let vehicle_type = resolve_vehicle_type(driver, date);
    let mut matches = rate_cards.iter().filter(|card| {
        card.active
            && card.service_week == week
            && card.service_title == service
            && card.vehicle_type == vehicle_type
    });

    let found = matches.next();
    if found.is_some() && matches.next().is_some() {
        warn!(
            "Multiple active rate cards for week={}, service={}, vehicle_type={}; using the first",
            week, service, vehicle_type
        );
    }
    if found.is_none() {
        debug!(
            "No rate card: driver={}, date={}, week={}, service={}, vehicle_type={}",
            driver.id, date, week, service, vehicle_type
        );
    }
    found
}

/// Same as [`find_rate_card`] with the week derived from `date`.
pub fn find_rate_card_for_date<'a>(
    date: NaiveDate,
    rate_cards: &'a [RateCard],
    service: &str,
    driver: &Driver,
) -> Option<&'a RateCard> {
    find_rate_card(date, rate_cards, &week_label(date), service, driver)
}

type LookupKey = (NaiveDate, ServiceName, DriverId);

/// Per-pass memo of rate card resolution, one lookup per grid cell.
///
/// Borrowed catalog, so it cannot outlive the snapshot it was built from.
pub struct RateCardLookup<'a> {
    rate_cards: &'a [RateCard],
    resolved: HashMap<LookupKey, Option<&'a RateCard>>,
}

impl<'a> RateCardLookup<'a> {
    pub fn new(rate_cards: &'a [RateCard]) -> Self {
        Self {
            rate_cards,
            resolved: HashMap::new(),
        }
    }

    pub fn get(&mut self, date: NaiveDate, service: &str, driver: &Driver) -> Option<&'a RateCard> {
        let key = (date, service.to_string(), driver.id.clone());
        let rate_cards = self.rate_cards;
        *self
            .resolved
            .entry(key)
            .or_insert_with(|| find_rate_card_for_date(date, rate_cards, service, driver))
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}
