//! Wire-format types for the FuelCheck v2 endpoints

use crate::fuel::{FuelType, Region, StationKey, StationPrice};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// Credential pair issued by the API portal
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// OAuth token response
#[derive(Debug, Clone, Deserialize)]
pub struct RawAccessToken {
    pub access_token: String,
    /// The portal returns this as a string of seconds
    #[serde(default)]
    pub expires_in: Option<String>,
}

impl RawAccessToken {
    /// Token lifetime in seconds, with the portal's documented default
    pub fn expires_in_secs(&self) -> u64 {
        self.expires_in
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(3600)
    }
}

/// Station metadata as returned inside price responses
#[derive(Debug, Clone, Deserialize)]
pub struct RawStation {
    pub code: u32,
    #[serde(default)]
    pub brand: Option<String>,
    pub name: String,
    pub location: RawLocation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Present on radius queries only
    #[serde(default)]
    pub distance: Option<f64>,
}

/// One price row; joined to its station via `stationcode`
#[derive(Debug, Clone, Deserialize)]
pub struct RawPrice {
    pub stationcode: u32,
    pub fueltype: String,
    pub price: f64,
    #[serde(default)]
    pub lastupdated: Option<String>,
}

/// Combined stations + prices payload shared by both query endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPricesResponse {
    #[serde(default)]
    pub stations: Vec<RawStation>,
    #[serde(default)]
    pub prices: Vec<RawPrice>,
}

impl RawPricesResponse {
    /// Join price rows to their stations and convert into domain records.
    ///
    /// Rows referencing an unknown station or carrying a fuel code we do not
    /// know are dropped here; price validity is enforced again at merge time.
    pub fn into_station_prices(self, region: Region, fetched_at: DateTime<Utc>) -> Vec<StationPrice> {
        let stations: std::collections::HashMap<u32, RawStation> = self
            .stations
            .into_iter()
            .map(|s| (s.code, s))
            .collect();

        let mut records = Vec::with_capacity(self.prices.len());
        for price in self.prices {
            let Some(station) = stations.get(&price.stationcode) else {
                continue;
            };
            let Some(fuel_type) = FuelType::from_code(&price.fueltype) else {
                continue;
            };
            let observed_at = price
                .lastupdated
                .as_deref()
                .and_then(parse_api_timestamp)
                .unwrap_or(fetched_at);

            records.push(StationPrice {
                station: StationKey::new(station.code, region),
                brand: station.brand.clone(),
                name: station.name.clone(),
                latitude: station.location.latitude,
                longitude: station.location.longitude,
                fuel_type,
                price: price.price,
                distance_km: station.location.distance,
                observed_at,
            });
        }
        records
    }
}

/// The API reports naive local timestamps like "02/06/2024 09:30:45";
/// they are stored as UTC since only relative ordering matters to the store.
fn parse_api_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%d/%m/%Y %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> RawPricesResponse {
        serde_json::from_str(
            r#"{
                "stations": [
                    {"code": 250, "brand": "Caltex", "name": "Caltex Epping",
                     "location": {"latitude": -33.77, "longitude": 151.08, "distance": 2.4}}
                ],
                "prices": [
                    {"stationcode": 250, "fueltype": "U91", "price": 183.9,
                     "lastupdated": "02/06/2024 09:30:45"},
                    {"stationcode": 250, "fueltype": "JET", "price": 120.0},
                    {"stationcode": 999, "fueltype": "U91", "price": 150.0}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn join_drops_unknown_fuel_and_orphan_prices() {
        let records = sample_response().into_station_prices(Region::Nsw, Utc::now());
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.station, StationKey::new(250, Region::Nsw));
        assert_eq!(r.fuel_type, FuelType::U91);
        assert_eq!(r.price, 183.9);
        assert_eq!(r.distance_km, Some(2.4));
        assert_eq!(r.observed_at.to_rfc3339(), "2024-06-02T09:30:45+00:00");
    }

    #[test]
    fn missing_lastupdated_falls_back_to_fetch_time() {
        let fetched_at = Utc::now();
        let resp: RawPricesResponse = serde_json::from_str(
            r#"{
                "stations": [
                    {"code": 7, "name": "United Hobart",
                     "location": {"latitude": -42.88, "longitude": 147.33}}
                ],
                "prices": [{"stationcode": 7, "fueltype": "DL", "price": 190.5}]
            }"#,
        )
        .unwrap();
        let records = resp.into_station_prices(Region::Tas, fetched_at);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].observed_at, fetched_at);
        assert_eq!(records[0].distance_km, None);
    }

    #[test]
    fn token_lifetime_parsing() {
        let tok: RawAccessToken =
            serde_json::from_str(r#"{"access_token": "abc", "expires_in": "3599"}"#).unwrap();
        assert_eq!(tok.expires_in_secs(), 3599);

        let tok: RawAccessToken = serde_json::from_str(r#"{"access_token": "abc"}"#).unwrap();
        assert_eq!(tok.expires_in_secs(), 3600);
    }
}
