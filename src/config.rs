//! Configuration management for Bowser
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{BowserError, Result};
use crate::fuel::{FuelType, Region};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Northern extent of the covered area (Cameron Corner)
pub const LAT_NORTH_BOUND: f64 = -28.996_08;
/// Southern extent of the covered area (below Tasmania)
pub const LAT_SOUTH_BOUND: f64 = -50.0;
/// Western extent of the covered area (Cameron Corner)
pub const LON_WEST_BOUND: f64 = 141.001_8;
/// Eastern extent of the covered area (off the NSW coast)
pub const LON_EAST_BOUND: f64 = 154.0;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// FuelCheck API access configuration
    pub api: ApiConfig,

    /// Polling cadence and query shape
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// User locations ("Home", "Work", ...) with their selected stations
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

/// FuelCheck API access parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// OAuth client id issued by the API portal
    pub client_id: String,

    /// OAuth client secret issued by the API portal
    pub client_secret: String,

    /// API base URL
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Polling cadence and query shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Hours between poll cycles (the API data changes slowly)
    pub interval_hours: u64,

    /// Radius in km for "cheapest nearby" queries
    pub radius_km: f64,

    /// Cap on stations accepted from a single radius response
    pub station_list_limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level override
    #[serde(default)]
    pub console_level: Option<String>,

    /// Optional file-specific level override
    #[serde(default)]
    pub file_level: Option<String>,

    /// Path to log file (or directory for rotation)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// One user location nickname with its geographic anchor and selections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// User-chosen nickname, unique case-insensitively ("Home", "Work")
    pub nickname: String,

    /// Latitude of the anchor point
    pub latitude: f64,

    /// Longitude of the anchor point
    pub longitude: f64,

    /// Fuel types ranked for the "cheapest nearby" sensors of this location
    #[serde(default = "default_cheapest_fuel_types")]
    pub fuel_types: Vec<FuelType>,

    /// Stations the user selected for per-station sensors
    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

/// One user-selected station under a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// FuelCheck station code
    pub code: u32,

    /// Jurisdiction the code belongs to
    pub region: Region,

    /// Display name captured at selection time
    pub name: String,

    /// Fuel types to track at this station
    #[serde(default)]
    pub fuel_types: Vec<FuelType>,
}

fn default_cheapest_fuel_types() -> Vec<FuelType> {
    // U91 gives the most reliable radius results; E10 augments it where sold
    vec![FuelType::U91, FuelType::E10]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            base_url: "https://api.onegov.nsw.gov.au".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_hours: 12,
            radius_km: 25.0,
            station_list_limit: 25,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/bowser.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            logging: LoggingConfig::default(),
            locations: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| BowserError::config(format!("invalid configuration: {}", e)))?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "bowser_config.yaml",
            "/data/bowser_config.yaml",
            "/etc/bowser/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.client_id.trim().is_empty() {
            return Err(BowserError::validation(
                "api.client_id",
                "API client id cannot be empty",
            ));
        }

        if self.api.client_secret.trim().is_empty() {
            return Err(BowserError::validation(
                "api.client_secret",
                "API client secret cannot be empty",
            ));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(BowserError::validation(
                "api.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.polling.interval_hours == 0 {
            return Err(BowserError::validation(
                "polling.interval_hours",
                "Must be greater than 0",
            ));
        }

        if !(self.polling.radius_km.is_finite() && self.polling.radius_km > 0.0) {
            return Err(BowserError::validation(
                "polling.radius_km",
                "Must be positive",
            ));
        }

        for location in &self.locations {
            Self::validate_coordinates(&location.nickname, location.latitude, location.longitude)?;
        }

        Ok(())
    }

    /// Coordinates must fall inside the NSW + TAS bounding box; anything
    /// outside it can never return results and is a configuration typo.
    fn validate_coordinates(nickname: &str, latitude: f64, longitude: f64) -> Result<()> {
        if !(LAT_SOUTH_BOUND..=LAT_NORTH_BOUND).contains(&latitude) {
            return Err(BowserError::validation(
                "locations.latitude",
                &format!("location '{}' is outside the covered area", nickname),
            ));
        }
        if !(LON_WEST_BOUND..=LON_EAST_BOUND).contains(&longitude) {
            return Err(BowserError::validation(
                "locations.longitude",
                &format!("location '{}' is outside the covered area", nickname),
            ));
        }
        Ok(())
    }
}
