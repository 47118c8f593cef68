//! Entity state model published to the presentation layer
//!
//! The dashboard host consumes one [`EntityState`] per selected
//! (station, fuel type) pair plus two "cheapest" slots per location group,
//! bundled into an immutable [`EntitySnapshot`]. Attributes are a fixed,
//! explicitly-typed record rather than a free-form bag, so the consumer
//! surface is stable across releases.

use crate::fuel::{FuelType, PRICE_UNIT, StationKey, StationPrice};
use crate::ranking::RankedEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable key for a station-level price sensor
pub fn station_entity_key(station: StationKey, fuel_type: FuelType) -> String {
    format!("{}_{}", station, fuel_type)
}

/// Stable key for one of a group's cheapest slots (1-based)
pub fn cheapest_entity_key(nickname: &str, slot: usize) -> String {
    format!("cheapest_{}_{}", nickname.to_lowercase(), slot)
}

/// Declared attribute set for every entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAttributes {
    pub station_code: Option<u32>,
    pub station_name: Option<String>,
    /// Fuel wire code ("U91")
    pub fuel_type: Option<String>,
    /// Human-readable product name ("Unleaded 91")
    pub fuel_label: Option<String>,
    /// Price in ¢/L, duplicated from the value for display convenience
    pub price: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
    /// 1-based slot for cheapest entities
    pub rank: Option<usize>,
    pub distance_km: Option<f64>,
    /// Data attribution for the jurisdiction backing this value
    pub attribution: Option<String>,
    pub unit: String,
}

/// One externally visible sensor value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_key: String,
    /// Price in ¢/L; None while unavailable
    pub value: Option<f64>,
    pub available: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub attributes: EntityAttributes,
}

impl EntityState {
    /// Station-level entity. Stays present (unavailable, not missing) when no
    /// observation has ever been recorded for the selection.
    pub fn for_station(
        configured_name: &str,
        station: StationKey,
        fuel_type: FuelType,
        record: Option<&StationPrice>,
    ) -> Self {
        let entity_key = station_entity_key(station, fuel_type);
        let attributes = EntityAttributes {
            station_code: Some(station.code),
            station_name: Some(
                record
                    .map(|r| r.name.clone())
                    .unwrap_or_else(|| configured_name.to_string()),
            ),
            fuel_type: Some(fuel_type.code().to_string()),
            fuel_label: Some(fuel_type.label().to_string()),
            price: record.map(|r| r.price),
            observed_at: record.map(|r| r.observed_at),
            rank: None,
            distance_km: None,
            attribution: Some(station.region.attribution().to_string()),
            unit: PRICE_UNIT.to_string(),
        };
        Self {
            entity_key,
            value: record.map(|r| r.price),
            available: record.is_some(),
            last_updated: record.map(|r| r.observed_at),
            attributes,
        }
    }

    /// Cheapest-slot entity for a group; unavailable when the slot is unfilled
    pub fn for_cheapest_slot(nickname: &str, slot: usize, entry: Option<&RankedEntry>) -> Self {
        let entity_key = cheapest_entity_key(nickname, slot);
        let attributes = EntityAttributes {
            station_code: entry.map(|e| e.station.code),
            station_name: entry.map(|e| e.station_name.clone()),
            fuel_type: entry.map(|e| e.fuel_type.code().to_string()),
            fuel_label: entry.map(|e| e.fuel_type.label().to_string()),
            price: entry.map(|e| e.price),
            observed_at: None,
            rank: Some(slot),
            distance_km: entry.and_then(|e| e.distance_km),
            attribution: entry.map(|e| e.station.region.attribution().to_string()),
            unit: PRICE_UNIT.to_string(),
        };
        Self {
            entity_key,
            value: entry.map(|e| e.price),
            available: entry.is_some(),
            last_updated: None,
            attributes,
        }
    }
}

/// Immutable per-cycle snapshot of every entity, keyed by entity key.
/// Fully replaces the previous snapshot on publish; never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub published_at: Option<DateTime<Utc>>,
    /// Poll cycle counter that produced this snapshot (0 = never polled)
    pub cycle: u64,
    pub entities: BTreeMap<String, EntityState>,
}

impl EntitySnapshot {
    pub fn get(&self, entity_key: &str) -> Option<&EntityState> {
        self.entities.get(entity_key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
