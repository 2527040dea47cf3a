//! WiFi geolocation provider client.
//!
//! Devices scan nearby WiFi access points and report paired
//! `ssid{i}`/`rssi{i}` values (MAC address and signal strength). We pass
//! the list to the geolocation provider and get back an estimated
//! latitude/longitude with an accuracy radius in metres.

use crate::config::DEFAULT_PROVIDER_URL;
use crate::event::{find, is_truthy, Geo, ValueEntry};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A WiFi base station sighting, in the provider's wire format.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPoint {
    pub mac_address: String,
    pub signal_strength: i64,
}

/// Resolved location and accuracy radius (metres).
#[derive(Clone, Copy, Debug)]
pub struct LocationAccuracy {
    pub location: Location,
    pub accuracy: f64,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
struct ProviderResponse {
    location: Option<Location>,
    accuracy: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderRequest {
    consider_ip: bool,
    wifi_access_points: Vec<AccessPoint>,
}

/// Geolocation stage errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GeolocateError {
    /// No usable ssid/rssi pairs in the batch. Fatal, non-retriable.
    MissingAccessPoints,
    /// Provider answered without location or accuracy.
    MalformedProviderResponse,
}

impl fmt::Display for GeolocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeolocateError::MissingAccessPoints => write!(f, "missing access points"),
            GeolocateError::MalformedProviderResponse => {
                write!(f, "provider response missing location or accuracy")
            }
        }
    }
}

impl std::error::Error for GeolocateError {}

/// Build the access-point list from paired `ssid{i}`/`rssi{i}` keys,
/// i = 0..=8.
///
/// An index contributes only when both halves are present and truthy;
/// `ssid9` and beyond are ignored.
pub fn access_points(values: &[ValueEntry]) -> Vec<AccessPoint> {
    let mut points = Vec::new();
    for i in 0..9 {
        let ssid = find(values, &format!("ssid{}", i));
        if !is_truthy(ssid) {
            continue;
        }
        let rssi = find(values, &format!("rssi{}", i));
        if !is_truthy(rssi) {
            continue;
        }
        let (Some(mac), Some(signal)) = (
            ssid.and_then(Value::as_str),
            rssi.and_then(Value::as_i64),
        ) else {
            continue;
        };
        points.push(AccessPoint {
            mac_address: mac.to_string(),
            signal_strength: signal,
        });
    }
    points
}

/// The two registry entries recording a resolved location: the `device`
/// value and the `geolocation_accuracy` value, both geo-annotated.
/// Must be in this shape for the dashboard map to render.
pub fn location_values(values: &[ValueEntry], resolved: &LocationAccuracy) -> Vec<ValueEntry> {
    let device = find(values, "device")
        .and_then(Value::as_str)
        .unwrap_or("(unknown)")
        .to_string();
    let geo = Geo {
        lat: resolved.location.lat,
        long: resolved.location.lng,
    };
    vec![
        ValueEntry {
            key: "device".to_string(),
            value: device.into(),
            geo: Some(geo),
        },
        ValueEntry {
            key: "geolocation_accuracy".to_string(),
            value: resolved.accuracy.into(),
            geo: Some(geo),
        },
    ]
}

/// HTTP client for the geolocation provider.
pub struct GeolocationClient {
    api_key: String,
    http_client: Client,
    base_url: String,
}

impl GeolocationClient {
    /// Create a client using the default provider base URL.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_PROVIDER_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing with a mock server).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            http_client: Client::new(),
            base_url,
        }
    }

    /// Resolve a location from the batch's WiFi sightings.
    ///
    /// Fails with [`GeolocateError::MissingAccessPoints`] when the batch
    /// carries no usable pairs, and does not fall back to IP geolocation.
    pub async fn locate(&self, values: &[ValueEntry]) -> Result<LocationAccuracy> {
        let points = access_points(values);
        if points.is_empty() {
            return Err(GeolocateError::MissingAccessPoints.into());
        }

        let url = format!(
            "{}/geolocation/v1/geolocate?key={}",
            self.base_url, self.api_key
        );
        let request = ProviderRequest {
            consider_ip: false,
            wifi_access_points: points,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send geolocation request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            anyhow::bail!("Geolocation provider returned status {}: {}", status, body);
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .context("Failed to parse geolocation response")?;

        match (parsed.location, parsed.accuracy) {
            (Some(location), Some(accuracy)) => Ok(LocationAccuracy { location, accuracy }),
            _ => Err(GeolocateError::MalformedProviderResponse.into()),
        }
    }
}
