//! Group resolver
//!
//! Maps the configuration snapshot's locations into validated [`Group`]
//! values for one poll cycle. Resolution is pure and deterministic; a group
//! that fails validation is skipped with a warning so the remaining groups
//! still poll (unknown fuel-type codes never reach this point, they are
//! rejected when the configuration is parsed).

use crate::config::LocationConfig;
use crate::fuel::{FuelType, StationKey};
use crate::logging::get_logger;
use std::collections::BTreeSet;

/// One user-selected station with its tracked fuel types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationSelection {
    pub key: StationKey,
    pub name: String,
    pub fuel_types: BTreeSet<FuelType>,
}

/// A validated location group for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Unique nickname (case-insensitive uniqueness enforced here)
    pub nickname: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Fuel types ranked for this group's cheapest slots
    pub fuel_types: BTreeSet<FuelType>,
    /// Member stations for per-station sensors
    pub stations: Vec<StationSelection>,
}

/// Resolve the configured locations into groups for this cycle.
///
/// Skips (with a warning) duplicate nicknames and groups left with neither a
/// fuel type nor a member station after validation; never aborts the caller.
pub fn resolve_groups(locations: &[LocationConfig]) -> Vec<Group> {
    let logger = get_logger("groups");
    let mut seen_nicknames: BTreeSet<String> = BTreeSet::new();
    let mut groups = Vec::with_capacity(locations.len());

    for location in locations {
        let nickname = location.nickname.trim();
        if nickname.is_empty() {
            logger.warn("Skipping location with empty nickname");
            continue;
        }
        if !seen_nicknames.insert(nickname.to_lowercase()) {
            logger.warn(&format!(
                "Skipping duplicate location nickname '{}'",
                nickname
            ));
            continue;
        }

        let mut stations = Vec::with_capacity(location.stations.len());
        for station in &location.stations {
            if station.fuel_types.is_empty() {
                logger.warn(&format!(
                    "Station {} ({}) has no fuel types configured",
                    station.name, station.code
                ));
                continue;
            }
            stations.push(StationSelection {
                key: StationKey::new(station.code, station.region),
                name: station.name.clone(),
                fuel_types: station.fuel_types.iter().copied().collect(),
            });
        }

        let fuel_types: BTreeSet<FuelType> = location.fuel_types.iter().copied().collect();
        if fuel_types.is_empty() && stations.is_empty() {
            logger.warn(&format!(
                "Skipping location '{}': no fuel types and no stations selected",
                nickname
            ));
            continue;
        }

        groups.push(Group {
            nickname: nickname.to_string(),
            latitude: location.latitude,
            longitude: location.longitude,
            fuel_types,
            stations,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StationConfig;
    use crate::fuel::Region;

    fn location(nickname: &str) -> LocationConfig {
        LocationConfig {
            nickname: nickname.to_string(),
            latitude: -33.87,
            longitude: 151.21,
            fuel_types: vec![FuelType::U91, FuelType::E10],
            stations: vec![StationConfig {
                code: 250,
                region: Region::Nsw,
                name: "Caltex Epping".to_string(),
                fuel_types: vec![FuelType::U91],
            }],
        }
    }

    #[test]
    fn resolves_valid_locations() {
        let groups = resolve_groups(&[location("Home"), location("Work")]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].nickname, "Home");
        assert_eq!(groups[0].stations.len(), 1);
        assert!(groups[0].fuel_types.contains(&FuelType::E10));
    }

    #[test]
    fn duplicate_nicknames_skip_the_later_entry() {
        let groups = resolve_groups(&[location("Home"), location("home")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].nickname, "Home");
    }

    #[test]
    fn group_with_nothing_selected_is_skipped() {
        let mut loc = location("Home");
        loc.fuel_types.clear();
        loc.stations.clear();
        assert!(resolve_groups(&[loc]).is_empty());
    }

    #[test]
    fn station_without_fuel_types_is_dropped() {
        let mut loc = location("Home");
        loc.stations[0].fuel_types.clear();
        let groups = resolve_groups(&[loc]);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].stations.is_empty());
    }

    #[test]
    fn cheapest_only_group_is_valid() {
        let mut loc = location("Home");
        loc.stations.clear();
        let groups = resolve_groups(&[loc]);
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn resolution_is_deterministic() {
        let input = [location("Home"), location("Work")];
        assert_eq!(resolve_groups(&input), resolve_groups(&input));
    }
}
