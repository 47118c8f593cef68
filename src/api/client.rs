//! FuelCheck API client
//!
//! Production implementation of [`FuelApiClient`] over the public FuelCheck
//! endpoints, with OAuth client-credentials token caching.

use crate::api::types::{ApiCredentials, RawAccessToken, RawPricesResponse};
use crate::config::ApiConfig;
use crate::error::{BowserError, Result};
use crate::fuel::{FuelType, Region, StationKey, StationPrice};
use crate::logging::get_logger;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Data source boundary for the poll coordinator.
///
/// One method per upstream query shape: a per-station price list, and a
/// radius query around a geographic center for one fuel type.
#[async_trait::async_trait]
pub trait FuelApiClient: Send + Sync {
    /// Current prices for every fuel type stocked at one station
    async fn station_prices(&self, station: StationKey) -> Result<Vec<StationPrice>>;

    /// Prices for one fuel type at stations within `radius_km` of a center.
    /// The upstream already biases this candidate set by distance.
    async fn prices_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        fuel_type: FuelType,
    ) -> Result<Vec<StationPrice>>;
}

struct CachedToken {
    bearer: String,
    valid_until: Instant,
}

/// HTTP client for the FuelCheck API
pub struct FuelCheckClient {
    credentials: ApiCredentials,
    base_url: String,
    http: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
    transaction_seq: AtomicU64,
    logger: crate::logging::StructuredLogger,
}

impl FuelCheckClient {
    /// Create a client from the API configuration section
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            credentials: ApiCredentials {
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            },
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            token: Mutex::new(None),
            transaction_seq: AtomicU64::new(1),
            logger: get_logger("api"),
        })
    }

    /// Fetch or reuse the cached bearer token
    async fn bearer_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() < cached.valid_until
        {
            return Ok(cached.bearer.clone());
        }

        let url = format!(
            "{}/oauth/client_credential/accesstoken?grant_type=client_credentials",
            self.base_url
        );
        let resp = self
            .http
            .get(&url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(BowserError::auth(format!(
                "token request rejected: {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(BowserError::transport(format!(
                "token request failed: {}",
                status
            )));
        }

        let token: RawAccessToken = resp.json().await?;
        // Renew one minute early so in-flight requests never race expiry
        let lifetime = token.expires_in_secs().saturating_sub(60).max(60);
        let bearer = token.access_token.clone();
        *guard = Some(CachedToken {
            bearer: bearer.clone(),
            valid_until: Instant::now() + Duration::from_secs(lifetime),
        });
        self.logger.debug("Refreshed FuelCheck access token");
        Ok(bearer)
    }

    fn next_transaction_id(&self) -> String {
        let seq = self.transaction_seq.fetch_add(1, Ordering::Relaxed);
        format!("bowser-{}-{}", chrono::Utc::now().timestamp(), seq)
    }

    fn map_error_status(status: reqwest::StatusCode, context: &str) -> BowserError {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            BowserError::auth(format!("{}: {}", context, status))
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            BowserError::rate_limit(format!("{}: {}", context, status))
        } else {
            BowserError::transport(format!("{}: {}", context, status))
        }
    }

    async fn send_prices_request(
        &self,
        request: reqwest::RequestBuilder,
        region: Region,
        context: &str,
    ) -> Result<Vec<StationPrice>> {
        let bearer = self.bearer_token().await?;
        let resp = request
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", bearer))
            .header("apikey", self.credentials.client_id.clone())
            .header("transactionid", self.next_transaction_id())
            .header(
                "requesttimestamp",
                chrono::Utc::now().format("%d/%m/%Y %I:%M:%S %p").to_string(),
            )
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Self::map_error_status(status, context));
        }

        let payload: RawPricesResponse = resp.json().await?;
        let records = payload.into_station_prices(region, chrono::Utc::now());
        if records.is_empty() {
            return Err(BowserError::empty_result(format!(
                "{}: no price records",
                context
            )));
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl FuelApiClient for FuelCheckClient {
    async fn station_prices(&self, station: StationKey) -> Result<Vec<StationPrice>> {
        let url = format!(
            "{}/FuelPriceCheck/v2/fuel/prices/station/{}",
            self.base_url, station.code
        );
        let request = self
            .http
            .get(&url)
            .query(&[("states", station.region.code())]);
        self.send_prices_request(request, station.region, &format!("station {}", station))
            .await
    }

    async fn prices_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        fuel_type: FuelType,
    ) -> Result<Vec<StationPrice>> {
        let url = format!("{}/FuelPriceCheck/v2/fuel/prices/nearby", self.base_url);
        // The nearby payload carries no state marker; a center south of Bass
        // Strait can only be TAS.
        let region = if latitude <= -39.0 { Region::Tas } else { Region::Nsw };
        let body = serde_json::json!({
            "fueltype": fuel_type.code(),
            "latitude": latitude,
            "longitude": longitude,
            "radius": radius_km,
        });
        let request = self.http.post(&url).json(&body);
        self.send_prices_request(
            request,
            region,
            &format!("radius query {} @ {:.4},{:.4}", fuel_type, latitude, longitude),
        )
        .await
    }
}
