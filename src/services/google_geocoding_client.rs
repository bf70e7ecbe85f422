// src/services/google_geocoding_client.rs
// DOCUMENTATION: Google Geocoding / Places API client
// PURPOSE: Reverse geocoding for the address resolver plus autocomplete and place details

use crate::errors::RentalError;
use crate::models::{AddressComponent, GeoCandidate, LatLng, ReverseGeocodeResponse};
use crate::services::geocode_resolver::ReverseGeocoder;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

/// Google Maps platform client
/// DOCUMENTATION: Every request is bounded by the configured timeout and
/// throttled by a process-wide rate limiter to protect the API quota
pub struct GoogleGeocodingClient {
    /// HTTP client for making requests (carries the timeout)
    client: Client,
    /// Google API key
    api_key: String,
    /// Base URL for Google Maps APIs
    base_url: String,
    /// Country restriction for autocomplete (e.g., "tn")
    country_code: String,
    /// Outbound request throttle
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

/// Response from the Geocoding API
#[derive(Debug, Deserialize, Serialize)]
pub struct GoogleGeocodeResponse {
    #[serde(default)]
    pub results: Vec<GoogleGeocodeResult>,
    pub status: String,
    pub error_message: Option<String>,
}

/// Individual reverse geocoding result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleGeocodeResult {
    pub formatted_address: String,
    pub geometry: GoogleGeometry,
    #[serde(default)]
    pub address_components: Vec<GoogleAddressComponent>,
}

/// Geographic location from Google
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleGeometry {
    pub location: GoogleLocation,
}

/// Coordinates from Google
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Address component from Google
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleAddressComponent {
    /// Long name (e.g., "Tunis", "Avenue Habib Bourguiba")
    pub long_name: String,
    /// Short name (e.g., "TN")
    #[serde(default)]
    pub short_name: String,
    /// Types of this component (e.g., ["locality", "political"])
    #[serde(default)]
    pub types: Vec<String>,
}

/// Autocomplete suggestion
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlacePrediction {
    pub description: String,
    pub place_id: String,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResponse {
    #[serde(default)]
    predictions: Vec<PlacePrediction>,
    status: String,
    error_message: Option<String>,
}

/// Place details restricted to what the listing form needs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaceDetails {
    pub name: String,
    pub geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    result: Option<PlaceDetails>,
    status: String,
    error_message: Option<String>,
}

impl From<GoogleGeocodeResult> for GeoCandidate {
    fn from(result: GoogleGeocodeResult) -> Self {
        GeoCandidate {
            formatted_address: result.formatted_address,
            location: LatLng::new(result.geometry.location.lat, result.geometry.location.lng),
            address_components: result
                .address_components
                .into_iter()
                .map(|component| AddressComponent {
                    long_name: component.long_name,
                    types: component.types,
                })
                .collect(),
        }
    }
}

impl GoogleGeocodingClient {
    /// Create new client
    /// DOCUMENTATION: `timeout` bounds each request end to end
    pub fn new(
        api_key: String,
        timeout: Duration,
        requests_per_second: u32,
        country_code: String,
    ) -> Result<Self, RentalError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            log::error!("Failed to build HTTP client: {}", e);
            RentalError::ExternalApiError(format!("Client setup failed: {}", e))
        })?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            api_key,
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            country_code,
            limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    /// Point the client at another host (used by tests and proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Autocomplete free-text input into place suggestions within the configured country
    pub async fn autocomplete(&self, input: &str) -> Result<Vec<PlacePrediction>, RentalError> {
        if input.trim().is_empty() {
            return Err(RentalError::InvalidInput("input cannot be empty".to_string()));
        }

        let url = format!("{}/place/autocomplete/json", self.base_url);
        let params = [
            ("input", input.to_string()),
            ("components", format!("country:{}", self.country_code)),
            ("key", self.api_key.clone()),
        ];

        log::debug!("Google Places autocomplete: input={}", input);

        let api_response: AutocompleteResponse = self.get_json(&url, &params).await?;
        check_quota(&api_response.status, api_response.error_message.as_deref())?;

        match api_response.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(api_response.predictions),
            other => Err(RentalError::ExternalApiError(format!(
                "Autocomplete status: {}",
                other
            ))),
        }
    }

    /// Look up name and coordinates of a place by its Google place id
    pub async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, RentalError> {
        if place_id.trim().is_empty() {
            return Err(RentalError::InvalidInput("no place_id provided".to_string()));
        }

        let url = format!("{}/place/details/json", self.base_url);
        let params = [
            ("place_id", place_id.to_string()),
            ("fields", "geometry,name".to_string()),
            ("key", self.api_key.clone()),
        ];

        log::debug!("Google Places details lookup: place_id={}", place_id);

        let api_response: DetailsResponse = self.get_json(&url, &params).await?;
        check_quota(&api_response.status, api_response.error_message.as_deref())?;

        match (api_response.status.as_str(), api_response.result) {
            ("OK", Some(details)) => Ok(details),
            ("NOT_FOUND", _) | ("ZERO_RESULTS", _) | ("OK", None) => {
                Err(RentalError::NotFound(place_id.to_string()))
            }
            (other, _) => Err(RentalError::ExternalApiError(format!(
                "Details status: {}",
                other
            ))),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, RentalError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                log::error!("Google API request failed: {}", e);
                if e.is_timeout() {
                    RentalError::ExternalApiError("Request timed out".to_string())
                } else {
                    RentalError::ExternalApiError(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("Google API error {}: {}", status, body);
            return Err(RentalError::ExternalApiError(format!(
                "API error {}: {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            log::error!("Failed to parse Google API response: {}", e);
            RentalError::ExternalApiError(format!("Parse error: {}", e))
        })
    }
}

/// Map quota and credential statuses to errors; everything else passes
fn check_quota(status: &str, error_message: Option<&str>) -> Result<(), RentalError> {
    match status {
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
            log::error!("Google API quota exceeded");
            Err(RentalError::RateLimitExceeded)
        }
        "REQUEST_DENIED" | "INVALID_REQUEST" => {
            let msg = error_message.unwrap_or("Unknown error").to_string();
            log::error!("Google API request denied ({}): {}", status, msg);
            Err(RentalError::ExternalApiError(msg))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocodingClient {
    /// Reverse geocode a coordinate into raw candidates
    /// DOCUMENTATION: Transport, HTTP and quota failures are errors; the API's
    /// own status ("OK", "ZERO_RESULTS", ...) is handed back to the resolver
    async fn reverse_geocode(&self, query: LatLng) -> Result<ReverseGeocodeResponse, RentalError> {
        let url = format!("{}/geocode/json", self.base_url);
        let params = [
            ("latlng", format!("{},{}", query.lat, query.lng)),
            ("key", self.api_key.clone()),
        ];

        log::debug!("Google reverse geocode: lat={}, lng={}", query.lat, query.lng);

        let api_response: GoogleGeocodeResponse = self.get_json(&url, &params).await?;
        check_quota(&api_response.status, api_response.error_message.as_deref())?;

        log::info!(
            "Google reverse geocode returned {} results (status {})",
            api_response.results.len(),
            api_response.status
        );

        Ok(ReverseGeocodeResponse {
            status: api_response.status,
            candidates: api_response.results.into_iter().map(GeoCandidate::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOCODE_FIXTURE: &str = r#"{
        "results": [
            {
                "formatted_address": "Avenue Habib Bourguiba, Tunis, Tunisia",
                "geometry": { "location": { "lat": 36.7998, "lng": 10.1866 } },
                "address_components": [
                    { "long_name": "Avenue Habib Bourguiba", "short_name": "Av. Habib Bourguiba", "types": ["route"] },
                    { "long_name": "Tunis", "short_name": "Tunis", "types": ["locality", "political"] },
                    { "long_name": "Tunisia", "short_name": "TN", "types": ["country", "political"] }
                ]
            },
            {
                "formatted_address": "Tunis, Tunisia",
                "geometry": { "location": { "lat": 36.8065, "lng": 10.1815 } },
                "address_components": [
                    { "long_name": "Tunis", "short_name": "Tunis", "types": ["locality", "political"] }
                ]
            }
        ],
        "status": "OK"
    }"#;

    #[test]
    fn test_geocode_results_become_candidates() {
        let response: GoogleGeocodeResponse = serde_json::from_str(GEOCODE_FIXTURE).unwrap();
        let candidates: Vec<GeoCandidate> =
            response.results.into_iter().map(GeoCandidate::from).collect();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].location, LatLng::new(36.7998, 10.1866));
        assert!(candidates[0].address_components[0].has_type("route"));
        assert_eq!(candidates[0].address_components[2].long_name, "Tunisia");
        assert_eq!(candidates[1].formatted_address, "Tunis, Tunisia");
    }

    #[test]
    fn test_zero_results_without_results_field() {
        let response: GoogleGeocodeResponse =
            serde_json::from_str(r#"{ "status": "ZERO_RESULTS" }"#).unwrap();
        assert!(response.results.is_empty());
        assert!(check_quota(&response.status, None).is_ok());
    }

    #[test]
    fn test_quota_statuses_are_errors() {
        assert!(matches!(
            check_quota("OVER_QUERY_LIMIT", None),
            Err(RentalError::RateLimitExceeded)
        ));
        assert!(matches!(
            check_quota("REQUEST_DENIED", Some("The provided API key is invalid.")),
            Err(RentalError::ExternalApiError(msg)) if msg.contains("API key")
        ));
        assert!(check_quota("OK", None).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_external_error() {
        let client = GoogleGeocodingClient::new(
            "test_key".to_string(),
            Duration::from_millis(500),
            5,
            "tn".to_string(),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:9");

        let result = client.reverse_geocode(LatLng::new(36.8, 10.18)).await;
        assert!(matches!(result, Err(RentalError::ExternalApiError(_))));
    }

    #[tokio::test]
    async fn test_empty_autocomplete_input_rejected() {
        let client = GoogleGeocodingClient::new(
            "test_key".to_string(),
            Duration::from_secs(1),
            5,
            "tn".to_string(),
        )
        .unwrap();

        assert!(matches!(
            client.autocomplete("  ").await,
            Err(RentalError::InvalidInput(_))
        ));
        assert!(matches!(
            client.place_details("").await,
            Err(RentalError::InvalidInput(_))
        ));
    }
}
