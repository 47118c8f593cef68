//! Cheapest-station ranking
//!
//! Pure functions over the candidate records a poll cycle supplied for one
//! group. The upstream API already distance-biases its candidate sets, so
//! ranking is strictly price ascending; distance and station key only break
//! ties, which keeps the ordering total and deterministic.

use crate::fuel::{FuelType, StationKey, StationPrice};
use std::cmp::Ordering;

/// Number of "cheapest" slots published per group
pub const CHEAPEST_SLOTS: usize = 2;

/// E10 radius responses are noisy at small radii; only this many leading
/// entries of an E10 candidate list are considered.
pub const E10_SHORTLIST: usize = 5;

/// One slot in a group's cheapest ranking. Derived data, recomputed from
/// scratch every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    /// 1-based slot number
    pub rank: usize,
    pub station: StationKey,
    pub station_name: String,
    pub fuel_type: FuelType,
    /// Price in ¢/L
    pub price: f64,
    pub distance_km: Option<f64>,
}

fn compare(
    price_a: f64,
    distance_a: Option<f64>,
    station_a: StationKey,
    price_b: f64,
    distance_b: Option<f64>,
    station_b: StationKey,
) -> Ordering {
    let distance_a = distance_a.unwrap_or(f64::INFINITY);
    let distance_b = distance_b.unwrap_or(f64::INFINITY);
    price_a
        .total_cmp(&price_b)
        .then(distance_a.total_cmp(&distance_b))
        .then(station_a.cmp(&station_b))
}

/// Rank a candidate set for one (group, fuel type) and keep the `take`
/// cheapest entries.
///
/// Pure: the input is never mutated, and the result is independent of input
/// ordering. Invalid records are ignored. A station fills at most one slot.
pub fn top_cheapest(candidates: &[StationPrice], take: usize) -> Vec<RankedEntry> {
    let mut working: Vec<&StationPrice> = candidates.iter().filter(|c| c.is_valid()).collect();
    working.sort_by(|a, b| {
        compare(
            a.price,
            a.distance_km,
            a.station,
            b.price,
            b.distance_km,
            b.station,
        )
    });
    let mut seen = std::collections::BTreeSet::new();
    let mut ranked = Vec::with_capacity(take);
    for candidate in working {
        if ranked.len() == take {
            break;
        }
        if !seen.insert(candidate.station) {
            continue;
        }
        ranked.push(RankedEntry {
            rank: ranked.len() + 1,
            station: candidate.station,
            station_name: candidate.name.clone(),
            fuel_type: candidate.fuel_type,
            price: candidate.price,
            distance_km: candidate.distance_km,
        });
    }
    ranked
}

/// Merge per-fuel-type rankings into a group's final cheapest slots.
///
/// The same ordering is applied across fuel types, so a group's #1 slot is
/// the outright cheapest offer among everything its queries returned.
pub fn merge_slots(per_fuel: Vec<Vec<RankedEntry>>) -> Vec<RankedEntry> {
    let mut merged: Vec<RankedEntry> = per_fuel.into_iter().flatten().collect();
    merged.sort_by(|a, b| {
        compare(
            a.price,
            a.distance_km,
            a.station,
            b.price,
            b.distance_km,
            b.station,
        )
    });
    merged.truncate(CHEAPEST_SLOTS);
    for (index, entry) in merged.iter_mut().enumerate() {
        entry.rank = index + 1;
    }
    merged
}
