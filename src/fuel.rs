//! Fuel domain types shared across the crate
//!
//! Fuel type codes and the two covered jurisdictions mirror the FuelCheck
//! API's reference data. Station codes are not unique across jurisdictions,
//! so stations are always addressed by the (code, region) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit prices are reported in by the upstream API
pub const PRICE_UNIT: &str = "¢/L";

/// Fuel product codes known to the FuelCheck API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FuelType {
    E10,
    U91,
    E85,
    P95,
    P98,
    Diesel,
    PremiumDiesel,
    B20,
    Ev,
    Lpg,
    Lng,
    H2,
    Cng,
}

impl FuelType {
    /// Parse an API fuel code; unknown codes are rejected
    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "E10" => Some(Self::E10),
            "U91" => Some(Self::U91),
            "E85" => Some(Self::E85),
            "P95" => Some(Self::P95),
            "P98" => Some(Self::P98),
            "DL" => Some(Self::Diesel),
            "PDL" => Some(Self::PremiumDiesel),
            "B20" => Some(Self::B20),
            "EV" => Some(Self::Ev),
            "LPG" => Some(Self::Lpg),
            "LNG" => Some(Self::Lng),
            "H2" => Some(Self::H2),
            "CNG" => Some(Self::Cng),
            _ => None,
        }
    }

    /// Wire code as used by the API and in entity keys
    pub fn code(&self) -> &'static str {
        match self {
            Self::E10 => "E10",
            Self::U91 => "U91",
            Self::E85 => "E85",
            Self::P95 => "P95",
            Self::P98 => "P98",
            Self::Diesel => "DL",
            Self::PremiumDiesel => "PDL",
            Self::B20 => "B20",
            Self::Ev => "EV",
            Self::Lpg => "LPG",
            Self::Lng => "LNG",
            Self::H2 => "H2",
            Self::Cng => "CNG",
        }
    }

    /// Human-readable product name for display attributes
    pub fn label(&self) -> &'static str {
        match self {
            Self::E10 => "Ethanol 94",
            Self::U91 => "Unleaded 91",
            Self::E85 => "Ethanol 105",
            Self::P95 => "Premium 95",
            Self::P98 => "Premium 98",
            Self::Diesel => "Diesel",
            Self::PremiumDiesel => "Premium Diesel",
            Self::B20 => "Biodiesel 20",
            Self::Ev => "EV charge",
            Self::Lpg => "LPG",
            Self::Lng => "LNG",
            Self::H2 => "Hydrogen",
            Self::Cng => "CNG/NGV",
        }
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for FuelType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_code(&value).ok_or_else(|| format!("unknown fuel type code: {}", value))
    }
}

impl From<FuelType> for String {
    fn from(value: FuelType) -> Self {
        value.code().to_string()
    }
}

/// Jurisdiction covered by the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Region {
    Nsw,
    Tas,
}

impl Region {
    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NSW" => Some(Self::Nsw),
            "TAS" => Some(Self::Tas),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Nsw => "NSW",
            Self::Tas => "TAS",
        }
    }

    /// Data attribution string shown to the user per jurisdiction
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::Nsw => "NSW Government FuelCheck",
            Self::Tas => "FuelCheck TAS",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<String> for Region {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_code(&value).ok_or_else(|| format!("unknown region code: {}", value))
    }
}

impl From<Region> for String {
    fn from(value: Region) -> Self {
        value.code().to_string()
    }
}

/// Uniquely identifies a fuel station across both jurisdictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationKey {
    /// FuelCheck station code
    pub code: u32,

    /// Jurisdiction the code belongs to
    pub region: Region,
}

impl StationKey {
    pub fn new(code: u32, region: Region) -> Self {
        Self { code, region }
    }
}

impl std::fmt::Display for StationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.code, self.region)
    }
}

/// One observed price for one fuel type at one station.
///
/// Immutable once recorded; a newer observation for the same
/// (station, fuel_type) supersedes it in the store, it is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationPrice {
    pub station: StationKey,
    pub brand: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub fuel_type: FuelType,
    /// Price in ¢/L
    pub price: f64,
    /// Distance from the query center in km, when the record came from a
    /// radius query
    pub distance_km: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl StationPrice {
    /// A record is valid only when it carries a usable price
    pub fn is_valid(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }

    /// Stable entity key for the station-level sensor of this record
    pub fn entity_key(&self) -> String {
        format!("{}_{}", self.station, self.fuel_type)
    }
}
