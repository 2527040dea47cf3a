//! External push: forwards a finalized value set to the aggregation
//! endpoint as one flattened JSON object.
//!
//! Best-effort by policy: errors are logged by the caller and never
//! retried. Losing an occasional sample is acceptable; retrying would
//! risk the hosting execution budget.

use crate::event::{is_truthy, ValueEntry};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Flatten a value set into a single JSON object keyed by entry key.
///
/// Last value wins on duplicate keys. `geolocation_accuracy` is renamed
/// to `accuracy`. A geo annotation on any entry is copied to top-level
/// `latitude`/`longitude`, and if no truthy `accuracy` has been set by
/// then, a default of 99 is synthesized so the receiving map always has
/// a radius to render (a later real accuracy entry overwrites it).
pub fn flatten(values: &[ValueEntry]) -> Map<String, Value> {
    let mut body = Map::new();
    for entry in values {
        let key = if entry.key == "geolocation_accuracy" {
            "accuracy"
        } else {
            entry.key.as_str()
        };
        if key.is_empty() {
            continue;
        }
        body.insert(key.to_string(), entry.value.clone());

        if let Some(geo) = entry.geo {
            body.insert("latitude".to_string(), json!(geo.lat));
            body.insert("longitude".to_string(), json!(geo.long));
            if !is_truthy(body.get("accuracy")) {
                body.insert("accuracy".to_string(), json!(99));
            }
        }
    }
    body
}

/// HTTP client for the external aggregation endpoint.
pub struct PushClient {
    http_client: Client,
    endpoint: Option<String>,
}

impl PushClient {
    /// `endpoint` is the full push URL; `None` disables pushing.
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            endpoint,
        }
    }

    /// Push the flattened value set. No-op when no endpoint is
    /// configured; never attempts the network call in that case.
    pub async fn push(&self, values: &[ValueEntry]) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            debug!("Push endpoint not configured, skipping");
            return Ok(());
        };

        let body = flatten(values);
        debug!(endpoint = %endpoint, "Pushing sensor data");

        let response = self
            .http_client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .context("Failed to send push request")?;

        if !response.status().is_success() {
            anyhow::bail!("Push endpoint returned status {}", response.status());
        }

        Ok(())
    }
}
