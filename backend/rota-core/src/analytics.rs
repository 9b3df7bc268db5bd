// src/analytics.rs
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::config::EngineConfig;
use crate::continuity::{ContinuityEngine, ContinuityMap};
use crate::dates::date_key;
use crate::error::EngineResult;
use crate::integrity::check_unique_entries;
use crate::memo::{composite_key, driver_ids_part, schedule_part, MemoStats, MemoTable};
use crate::models::{Driver, ScheduleEntry};
use crate::streaks::{compute_streaks, StreakMap};

/// Memoized entry point for the schedule grid.
///
/// Results are shared and immutable until the driver set, the schedule set or
/// the candidate range changes.
#[derive(Clone)]
pub struct ScheduleAnalytics {
    continuity: ContinuityEngine,
    key_max_len: usize,
    streak_memo: MemoTable<StreakMap>,
    continuity_memo: MemoTable<ContinuityMap>,
}

impl ScheduleAnalytics {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            continuity: ContinuityEngine::new(config.max_consecutive_days)?,
            key_max_len: config.cache_key_max_len,
            streak_memo: MemoTable::new("streaks"),
            continuity_memo: MemoTable::new("continuity"),
        })
    }

    pub fn streak_key(&self, drivers: &[Driver], schedules: &[ScheduleEntry]) -> String {
        composite_key(
            &[
                ("drivers", driver_ids_part(drivers.iter().map(|d| &d.id))),
                ("schedules", schedule_part(schedules)),
            ],
            self.key_max_len,
        )
    }

    pub fn continuity_key(
        &self,
        drivers: &[Driver],
        schedules: &[ScheduleEntry],
        candidate_dates: &[NaiveDate],
    ) -> String {
        let mut candidates: Vec<NaiveDate> = candidate_dates.to_vec();
        candidates.sort_unstable();
        candidates.dedup();
        let candidates_part = candidates
            .iter()
            .map(|day| date_key(*day))
            .collect::<Vec<_>>()
            .join(",");
        composite_key(
            &[
                ("drivers", driver_ids_part(drivers.iter().map(|d| &d.id))),
                ("schedules", schedule_part(schedules)),
                ("run", self.continuity.run_length().to_string()),
                ("candidates", candidates_part),
            ],
            self.key_max_len,
        )
    }

    pub fn streaks(&self, drivers: &[Driver], schedules: &[ScheduleEntry]) -> EngineResult<Arc<StreakMap>> {
        let key = self.streak_key(drivers, schedules);
        self.streak_memo.try_get_or_compute(&key, || {
            check_unique_entries(schedules)?;
            info!(
                "Computing streaks for {} drivers over {} schedule entries",
                drivers.len(),
                schedules.len()
            );
            Ok(compute_streaks(drivers, schedules))
        })
    }

    pub fn continuity(
        &self,
        drivers: &[Driver],
        schedules: &[ScheduleEntry],
        candidate_dates: &[NaiveDate],
    ) -> EngineResult<Arc<ContinuityMap>> {
        let key = self.continuity_key(drivers, schedules, candidate_dates);
        self.continuity_memo.try_get_or_compute(&key, || {
            check_unique_entries(schedules)?;
            info!(
                "Computing continuity for {} drivers, {} candidate dates",
                drivers.len(),
                candidate_dates.len()
            );
            Ok(self.continuity.compute(drivers, schedules, candidate_dates))
        })
    }

    pub fn continuity_engine(&self) -> &ContinuityEngine {
        &self.continuity
    }

    pub fn streak_stats(&self) -> MemoStats {
        self.streak_memo.stats()
    }

    pub fn continuity_stats(&self) -> MemoStats {
        self.continuity_memo.stats()
    }

    /// Results currently held across both memo tables.
    pub fn cached_results(&self) -> usize {
        self.streak_memo.len() + self.continuity_memo.len()
    }

    /// Drops every memoized result.
    pub fn clear(&self) {
        self.streak_memo.clear();
        self.continuity_memo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{date_range, week_label};
    use crate::error::EngineError;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn entry(id: &str, driver_id: &str, day: NaiveDate) -> ScheduleEntry {
        ScheduleEntry {
            id: id.to_string(),
            driver_id: driver_id.to_string(),
            day,
            service: "Standard Parcel".to_string(),
            site: "DBS2".to_string(),
            week: week_label(day),
        }
    }

    fn analytics() -> ScheduleAnalytics {
        ScheduleAnalytics::new(&EngineConfig::default()).expect("default config is valid")
    }

    #[test]
    fn recomputes_only_when_key_changes() {
        let analytics = analytics();
        let drivers = vec![Driver::new("D1", "Van")];
        let mut schedules = vec![entry("S1", "D1", d("2024-01-01")), entry("S2", "D1", d("2024-01-02"))];

        analytics.streaks(&drivers, &schedules).expect("no duplicates");
        // Same set in a different order is the same key
        schedules.reverse();
        let again = analytics.streaks(&drivers, &schedules).expect("no duplicates");
        assert_eq!(again["D1"][&d("2024-01-02")], 2);
        assert_eq!(analytics.streak_stats().misses, 1);
        assert_eq!(analytics.streak_stats().hits, 1);

        schedules.push(entry("S3", "D1", d("2024-01-03")));
        let changed = analytics.streaks(&drivers, &schedules).expect("no duplicates");
        assert_eq!(changed["D1"][&d("2024-01-03")], 3);
        assert_eq!(analytics.streak_stats().misses, 2);
    }

    #[test]
    fn schedule_edits_keep_only_the_latest_result() {
        let analytics = analytics();
        let drivers = vec![Driver::new("D1", "Van")];
        let mut schedules = Vec::new();
        for (i, day) in date_range(d("2024-01-01"), d("2024-02-19")).into_iter().enumerate() {
            schedules.push(entry(&format!("S{}", i), "D1", day));
            analytics.streaks(&drivers, &schedules).expect("no duplicates");
            analytics
                .continuity(&drivers, &schedules, &[day])
                .expect("no duplicates");
        }
        assert_eq!(analytics.streak_stats().misses, 50);
        assert_eq!(analytics.cached_results(), 2);
    }

    #[test]
    fn duplicate_entries_surface_as_errors_and_are_not_cached() {
        let analytics = analytics();
        let drivers = vec![Driver::new("D1", "Van")];
        let schedules = vec![entry("S1", "D1", d("2024-01-01")), entry("S2", "D1", d("2024-01-01"))];

        let result = analytics.streaks(&drivers, &schedules);
        assert!(matches!(result, Err(EngineError::DuplicateScheduleEntry { .. })));
        assert!(analytics.continuity(&drivers, &schedules, &[d("2024-01-02")]).is_err());
        assert_eq!(analytics.streak_stats().misses, 0);
    }

    #[test]
    fn continuity_key_includes_candidate_range() {
        let analytics = analytics();
        let drivers = vec![Driver::new("D1", "Van")];
        let schedules: Vec<ScheduleEntry> = date_range(d("2024-01-01"), d("2024-01-06"))
            .into_iter()
            .enumerate()
            .map(|(i, day)| entry(&format!("S{}", i), "D1", day))
            .collect();

        let week = date_range(d("2024-01-01"), d("2024-01-07"));
        let first = analytics.continuity(&drivers, &schedules, &week).expect("valid");
        let second = analytics.continuity(&drivers, &schedules, &week).expect("valid");
        assert!(Arc::ptr_eq(&first, &second));

        let next_week = date_range(d("2024-01-08"), d("2024-01-14"));
        let other = analytics.continuity(&drivers, &schedules, &next_week).expect("valid");
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(analytics.continuity_stats().misses, 2);

        analytics.clear();
        analytics.continuity(&drivers, &schedules, &week).expect("valid");
        assert_eq!(analytics.continuity_stats().misses, 3);
    }
}
