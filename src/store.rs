//! Station record store
//!
//! Holds the latest known price for every (station, fuel type) pair the user
//! has ever selected. Entries are only ever superseded by strictly newer
//! observations or removed by explicit user action; a failed poll never
//! touches them.

use crate::fuel::{FuelType, StationKey, StationPrice};
use std::collections::BTreeMap;

/// Latest-known price per (station, fuel type)
#[derive(Debug, Default)]
pub struct PriceStore {
    records: BTreeMap<(StationKey, FuelType), StationPrice>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for its (station, fuel type) slot.
    ///
    /// Returns true when the record was accepted. Invalid records and records
    /// not strictly newer than the stored observation are ignored, which makes
    /// replaying the same response idempotent.
    pub fn upsert(&mut self, record: StationPrice) -> bool {
        if !record.is_valid() {
            return false;
        }
        let key = (record.station, record.fuel_type);
        match self.records.get(&key) {
            Some(existing) if existing.observed_at >= record.observed_at => false,
            _ => {
                self.records.insert(key, record);
                true
            }
        }
    }

    /// Latest record for one (station, fuel type), if ever observed
    pub fn get(&self, station: StationKey, fuel_type: FuelType) -> Option<&StationPrice> {
        self.records.get(&(station, fuel_type))
    }

    /// All records held for one station, ordered by fuel type
    pub fn all_for_station(&self, station: StationKey) -> Vec<&StationPrice> {
        self.records
            .iter()
            .filter(|((key, _), _)| *key == station)
            .map(|(_, record)| record)
            .collect()
    }

    /// Drop every record for a station the user removed from configuration.
    /// Returns the number of entries removed. Never called by polling.
    pub fn remove_station(&mut self, station: StationKey) -> usize {
        let before = self.records.len();
        self.records.retain(|(key, _), _| *key != station);
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::Region;
    use chrono::{Duration, TimeZone, Utc};

    fn record(code: u32, fuel_type: FuelType, price: f64, minutes: i64) -> StationPrice {
        StationPrice {
            station: StationKey::new(code, Region::Nsw),
            brand: None,
            name: format!("Station {}", code),
            latitude: -33.8,
            longitude: 151.0,
            fuel_type,
            price,
            distance_km: None,
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = PriceStore::new();
        let r = record(250, FuelType::U91, 183.9, 0);
        assert!(store.upsert(r.clone()));
        assert!(!store.upsert(r.clone()));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(r.station, FuelType::U91).map(|p| p.price),
            Some(183.9)
        );
    }

    #[test]
    fn older_observation_never_replaces_newer() {
        let mut store = PriceStore::new();
        assert!(store.upsert(record(250, FuelType::U91, 183.9, 10)));
        assert!(!store.upsert(record(250, FuelType::U91, 170.0, 5)));
        let station = StationKey::new(250, Region::Nsw);
        assert_eq!(store.get(station, FuelType::U91).map(|p| p.price), Some(183.9));
    }

    #[test]
    fn newer_observation_supersedes() {
        let mut store = PriceStore::new();
        assert!(store.upsert(record(250, FuelType::U91, 183.9, 0)));
        assert!(store.upsert(record(250, FuelType::U91, 179.5, 30)));
        let station = StationKey::new(250, Region::Nsw);
        assert_eq!(store.get(station, FuelType::U91).map(|p| p.price), Some(179.5));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalid_records_are_dropped() {
        let mut store = PriceStore::new();
        assert!(!store.upsert(record(250, FuelType::U91, 0.0, 0)));
        assert!(!store.upsert(record(250, FuelType::U91, f64::NAN, 0)));
        assert!(store.is_empty());
    }

    #[test]
    fn all_for_station_and_removal() {
        let mut store = PriceStore::new();
        store.upsert(record(250, FuelType::U91, 183.9, 0));
        store.upsert(record(250, FuelType::E10, 181.5, 0));
        store.upsert(record(300, FuelType::U91, 175.0, 0));

        let station = StationKey::new(250, Region::Nsw);
        let held = store.all_for_station(station);
        assert_eq!(held.len(), 2);

        assert_eq!(store.remove_station(station), 2);
        assert_eq!(store.len(), 1);
        assert!(store.all_for_station(station).is_empty());
    }

    #[test]
    fn same_code_different_region_is_a_distinct_station() {
        let mut store = PriceStore::new();
        store.upsert(record(250, FuelType::U91, 183.9, 0));
        let mut tas = record(250, FuelType::U91, 190.0, 0);
        tas.station = StationKey::new(250, Region::Tas);
        store.upsert(tas);
        assert_eq!(store.len(), 2);
    }
}
