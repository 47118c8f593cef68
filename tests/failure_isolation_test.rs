//! Partial and total upstream failure behavior
//!
//! A failed request must only ever cost its own contribution; a fully failed
//! cycle must leave the previously published snapshot untouched.

use bowser::api::FuelApiClient;
use bowser::config::{Config, LocationConfig, StationConfig};
use bowser::coordinator::{CycleState, PollCoordinator};
use bowser::error::{BowserError, Result};
use bowser::fuel::{FuelType, Region, StationKey, StationPrice};
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

const HOME: (f64, f64) = (-33.87, 151.21);
const WORK: (f64, f64) = (-33.75, 150.9);

/// Client that serves a fixed radius response per point unless the point has
/// been marked as failing.
#[derive(Default)]
struct FlakyClient {
    radius: Mutex<HashMap<String, Vec<StationPrice>>>,
    failing_points: Mutex<HashSet<String>>,
    stations: Mutex<HashMap<StationKey, Vec<StationPrice>>>,
    failing_stations: Mutex<HashSet<StationKey>>,
}

fn point(latitude: f64, longitude: f64) -> String {
    format!("{:.4},{:.4}", latitude, longitude)
}

impl FlakyClient {
    fn set_radius(&self, at: (f64, f64), records: Vec<StationPrice>) {
        self.radius.lock().unwrap().insert(point(at.0, at.1), records);
    }

    fn fail_point(&self, at: (f64, f64)) {
        self.failing_points.lock().unwrap().insert(point(at.0, at.1));
    }

    fn set_station(&self, station: StationKey, records: Vec<StationPrice>) {
        self.stations.lock().unwrap().insert(station, records);
    }

    fn fail_station(&self, station: StationKey) {
        self.failing_stations.lock().unwrap().insert(station);
    }

    fn fail_everything(&self) {
        for key in self.radius.lock().unwrap().keys() {
            self.failing_points.lock().unwrap().insert(key.clone());
        }
        for key in self.stations.lock().unwrap().keys() {
            self.failing_stations.lock().unwrap().insert(*key);
        }
    }
}

#[async_trait::async_trait]
impl FuelApiClient for FlakyClient {
    async fn station_prices(&self, station: StationKey) -> Result<Vec<StationPrice>> {
        if self.failing_stations.lock().unwrap().contains(&station) {
            return Err(BowserError::transport("scripted station outage"));
        }
        Ok(self
            .stations
            .lock()
            .unwrap()
            .get(&station)
            .cloned()
            .unwrap_or_default())
    }

    async fn prices_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        _radius_km: f64,
        fuel_type: FuelType,
    ) -> Result<Vec<StationPrice>> {
        let key = point(latitude, longitude);
        if self.failing_points.lock().unwrap().contains(&key) {
            return Err(BowserError::transport("scripted radius outage"));
        }
        let records = self
            .radius
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|r| r.fuel_type == fuel_type)
            .collect())
    }
}

fn record(code: u32, price: f64, minutes: i64) -> StationPrice {
    StationPrice {
        station: StationKey::new(code, Region::Nsw),
        brand: None,
        name: format!("Station {}", code),
        latitude: -33.8,
        longitude: 151.1,
        fuel_type: FuelType::U91,
        price,
        distance_km: Some(1.5),
        observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap() + Duration::minutes(minutes),
    }
}

fn two_location_config() -> Config {
    let mut config = Config::default();
    config.api.client_id = "client".to_string();
    config.api.client_secret = "secret".to_string();
    config.api.request_timeout_secs = 1;
    config.locations.push(LocationConfig {
        nickname: "Home".to_string(),
        latitude: HOME.0,
        longitude: HOME.1,
        fuel_types: vec![FuelType::U91],
        stations: Vec::new(),
    });
    config.locations.push(LocationConfig {
        nickname: "Work".to_string(),
        latitude: WORK.0,
        longitude: WORK.1,
        fuel_types: vec![FuelType::U91],
        stations: Vec::new(),
    });
    config
}

#[tokio::test]
async fn failed_group_keeps_prior_value_while_others_update() {
    let client = Arc::new(FlakyClient::default());
    client.set_radius(HOME, vec![record(300, 180.0, 0), record(301, 182.0, 0)]);
    client.set_radius(WORK, vec![record(400, 190.0, 0), record(401, 191.0, 0)]);

    let config = two_location_config();
    let mut coordinator = PollCoordinator::new(client.clone());
    coordinator.run_cycle(&config).await.unwrap();

    let first = coordinator.last_snapshot();
    assert_eq!(first.get("cheapest_work_1").unwrap().value, Some(190.0));

    // Home gets cheaper, Work's upstream goes dark
    client.set_radius(HOME, vec![record(300, 175.0, 60), record(301, 178.0, 60)]);
    client.fail_point(WORK);

    let report = coordinator.run_cycle(&config).await.unwrap();
    // No error raised for the cycle; the failure is contained to Work
    assert_eq!(report.failures, 1);
    assert_eq!(coordinator.state(), CycleState::Published);

    let second = coordinator.last_snapshot();
    assert_eq!(second.get("cheapest_home_1").unwrap().value, Some(175.0));

    let work = second.get("cheapest_work_1").unwrap();
    assert!(work.available);
    assert_eq!(work.value, Some(190.0));
    assert_eq!(
        second.get("cheapest_work_2").unwrap().value,
        first.get("cheapest_work_2").unwrap().value
    );
}

#[tokio::test]
async fn total_failure_preserves_snapshot_and_reports_once() {
    let client = Arc::new(FlakyClient::default());
    client.set_radius(HOME, vec![record(300, 180.0, 0)]);
    client.set_radius(WORK, vec![record(400, 190.0, 0)]);
    let station = StationKey::new(250, Region::Nsw);
    client.set_station(station, vec![record(250, 183.9, 0)]);

    let mut config = two_location_config();
    config.locations[0].stations.push(StationConfig {
        code: 250,
        region: Region::Nsw,
        name: "Station 250".to_string(),
        fuel_types: vec![FuelType::U91],
    });

    let mut coordinator = PollCoordinator::new(client.clone());
    coordinator.run_cycle(&config).await.unwrap();
    let before = coordinator.last_snapshot();

    client.fail_everything();
    let err = coordinator.run_cycle(&config).await.unwrap_err();
    assert!(matches!(err, BowserError::Cycle { .. }));
    assert_eq!(coordinator.state(), CycleState::Failed);
    assert_eq!(coordinator.failed_cycles(), 1);

    let after = coordinator.last_snapshot();
    // The previous snapshot object is still the published one, untouched
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(*before, *after);

    // Recovery on the next cycle
    client.failing_points.lock().unwrap().clear();
    client.failing_stations.lock().unwrap().clear();
    let report = coordinator.run_cycle(&config).await.unwrap();
    assert_eq!(report.failures, 0);
    assert_eq!(coordinator.state(), CycleState::Published);
}

#[tokio::test]
async fn selected_station_with_no_data_is_unavailable_not_missing() {
    let client = Arc::new(FlakyClient::default());
    // Station 999 is configured but the API has never returned a price for it
    let mut config = two_location_config();
    config.locations = config.locations[..1].to_vec();
    config.locations[0].fuel_types.clear();
    config.locations[0].stations.push(StationConfig {
        code: 999,
        region: Region::Nsw,
        name: "New Servo".to_string(),
        fuel_types: vec![FuelType::U91, FuelType::Diesel],
    });

    let mut coordinator = PollCoordinator::new(client);
    coordinator.run_cycle(&config).await.unwrap();

    let snapshot = coordinator.last_snapshot();
    for key in ["999_NSW_U91", "999_NSW_DL"] {
        let entity = snapshot.get(key).unwrap();
        assert!(!entity.available);
        assert_eq!(entity.value, None);
        assert_eq!(entity.attributes.station_name.as_deref(), Some("New Servo"));
    }
}

#[tokio::test]
async fn station_outage_keeps_previously_stored_price_available() {
    let client = Arc::new(FlakyClient::default());
    let station = StationKey::new(250, Region::Nsw);
    client.set_station(station, vec![record(250, 183.9, 0)]);
    client.set_radius(HOME, vec![record(300, 180.0, 0)]);

    let mut config = two_location_config();
    config.locations = config.locations[..1].to_vec();
    config.locations[0].stations.push(StationConfig {
        code: 250,
        region: Region::Nsw,
        name: "Station 250".to_string(),
        fuel_types: vec![FuelType::U91],
    });

    let mut coordinator = PollCoordinator::new(client.clone());
    coordinator.run_cycle(&config).await.unwrap();

    // Station goes dark but the group query still succeeds, so the cycle
    // publishes a freshly rebuilt snapshot
    client.fail_station(station);
    let report = coordinator.run_cycle(&config).await.unwrap();
    assert_eq!(report.failures, 1);

    let snapshot = coordinator.last_snapshot();
    assert_eq!(snapshot.cycle, 2);
    let entity = snapshot.get("250_NSW_U91").unwrap();
    // Backed by the stored observation from the first cycle
    assert!(entity.available);
    assert_eq!(entity.value, Some(183.9));
}
