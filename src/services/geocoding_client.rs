// src/services/geocoding_client.rs
// DOCUMENTATION: Geocoding API client
// PURPOSE: Resolve free-text addresses into coordinates at place creation

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::ListingsError;
use crate::models::Coordinates;

/// Request timeout; geocoding crosses an external boundary and must fail
/// bounded rather than hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Address resolution seam. PlaceService only ever sees this trait;
/// tests substitute a fixed resolver.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinates, ListingsError>;
}

/// Geocoding API client
/// DOCUMENTATION: Talks to a Google-style geocoding endpoint. Any failure
/// (transport, non-OK status, zero results) surfaces as a GeocodeError.
pub struct GoogleGeocodingClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Parsed geocoding response
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

impl GoogleGeocodingClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(
            api_key,
            "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
        )
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url,
        }
    }

    fn coordinates_from_response(
        address: &str,
        response: GeocodeResponse,
    ) -> Result<Coordinates, ListingsError> {
        if response.status != "OK" {
            let detail = response
                .error_message
                .unwrap_or_else(|| response.status.clone());
            log::warn!("Geocoding returned {} for '{}'", response.status, address);
            return Err(ListingsError::Geocode(format!(
                "could not resolve address '{}': {}",
                address, detail
            )));
        }

        response
            .results
            .first()
            .map(|r| Coordinates {
                lat: r.geometry.location.lat,
                lng: r.geometry.location.lng,
            })
            .ok_or_else(|| {
                ListingsError::Geocode(format!("no results for address '{}'", address))
            })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocodingClient {
    async fn resolve(&self, address: &str) -> Result<Coordinates, ListingsError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("address", address), ("key", &self.api_key)])
            .send()
            .await
            .map_err(|e| {
                log::error!("Geocoding request failed: {}", e);
                ListingsError::Geocode(format!("geocoding request failed: {}", e))
            })?;

        let parsed: GeocodeResponse = response.json().await.map_err(|e| {
            log::error!("Failed to parse geocoding response: {}", e);
            ListingsError::Geocode(format!("malformed geocoding response: {}", e))
        })?;

        let coordinates = Self::coordinates_from_response(address, parsed)?;
        log::debug!(
            "Resolved '{}' to ({}, {})",
            address,
            coordinates.lat,
            coordinates.lng
        );
        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_yields_first_result() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [
                    {"geometry": {"location": {"lat": 40.7484474, "lng": -73.9871516}}},
                    {"geometry": {"location": {"lat": 1.0, "lng": 2.0}}}
                ]
            }"#,
        )
        .unwrap();

        let coords =
            GoogleGeocodingClient::coordinates_from_response("20 W 34th St", response).unwrap();
        assert_eq!(coords.lat, 40.7484474);
        assert_eq!(coords.lng, -73.9871516);
    }

    #[test]
    fn zero_results_is_a_geocode_error() {
        let response: GeocodeResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();

        let err = GoogleGeocodingClient::coordinates_from_response("nowhere", response)
            .unwrap_err();
        assert!(matches!(err, ListingsError::Geocode(_)));
    }

    #[test]
    fn ok_status_with_empty_results_is_a_geocode_error() {
        let response: GeocodeResponse =
            serde_json::from_str(r#"{"status": "OK", "results": []}"#).unwrap();

        let err = GoogleGeocodingClient::coordinates_from_response("nowhere", response)
            .unwrap_err();
        assert!(matches!(err, ListingsError::Geocode(_)));
    }
}
