// src/dates.rs
//! Canonical calendar-day handling.
//!
//! Every map key, memo key and week label produced by the engines goes through
//! the functions here, so lookups never depend on locale formatting.

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

/// Format used by driver history timestamps and manual override keys.
pub const TRACE_DATE_FORMAT: &str = "%d/%m/%Y";

/// Canonical key for a calendar day (`YYYY-MM-DD`).
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a day the way driver histories store it (`D/M/YYYY`, no padding).
pub fn trace_date_string(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// Parses a `D/M/YYYY` (or zero-padded `DD/MM/YYYY`) history timestamp.
///
/// Returns `None` for anything else so callers can fail closed.
pub fn parse_trace_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let mut parts = trimmed.split('/');
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || year.len() != 4 {
        debug!("Rejecting trace timestamp with unexpected shape: {:?}", raw);
        return None;
    }
    let all_digits = |s: &str| !s.is_empty() && s.len() <= 4 && s.chars().all(|c| c.is_ascii_digit());
    if !(all_digits(day) && all_digits(month) && all_digits(year)) || day.len() > 2 || month.len() > 2 {
        debug!("Rejecting non-numeric trace timestamp: {:?}", raw);
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// ISO-week label (`2024-W05`) used as a rate card's `serviceWeek`.
pub fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

/// Whole days from `earlier` to `later` (negative when reversed).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

/// Inclusive list of days from `from` to `to`. Empty when `to < from`.
pub fn date_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut current = from;
    while current <= to {
        days.push(current);
        current = match current.checked_add_signed(Duration::days(1)) {
            Some(next) => next,
            None => break,
        };
    }
    days
}
