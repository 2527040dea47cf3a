//! Device registry updater.
//!
//! Persists an updated value set against a thing token. The broadcast
//! flag must be set on the write or live dashboard observers will not
//! see the update.

use crate::config::DEFAULT_REGISTRY_URL;
use crate::event::{ValidationError, ValueEntry};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

#[derive(Serialize)]
struct UpdateRequest<'a> {
    values: &'a [ValueEntry],
}

/// HTTP client for the device registry.
pub struct RegistryClient {
    http_client: Client,
    base_url: String,
}

impl RegistryClient {
    /// Create a client using the default registry base URL.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_REGISTRY_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing with a mock server).
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
        }
    }

    /// Persist a value set against a thing, broadcasting to dashboards.
    ///
    /// At-least-once: the only idempotency protection is the
    /// `transformed`/`timestamp` markers already inside the value set.
    /// Fails with [`ValidationError::MissingIdentity`] when the token is
    /// empty; transport failures are returned to the caller, which logs
    /// and drops them.
    pub async fn update(&self, thing_token: &str, values: &[ValueEntry]) -> Result<()> {
        if thing_token.is_empty() {
            return Err(ValidationError::MissingIdentity.into());
        }

        let url = format!(
            "{}/v2/things/{}?broadcast=true",
            self.base_url, thing_token
        );
        let response = self
            .http_client
            .post(&url)
            .json(&UpdateRequest { values })
            .send()
            .await
            .context("Failed to send registry update")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            anyhow::bail!("Registry returned status {}: {}", status, body);
        }

        Ok(())
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_posts_with_broadcast() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/things/tok-123?broadcast=true")
            .match_body(mockito::Matcher::Json(json!({
                "values": [{"key": "tmp", "value": 26.26}]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = RegistryClient::with_base_url(server.url());
        client
            .update("tok-123", &[ValueEntry::new("tmp", 26.26)])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_missing_identity_is_fatal() {
        let client = RegistryClient::with_base_url("http://localhost:9".to_string());
        let err = client
            .update("", &[ValueEntry::new("tmp", 26.26)])
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::MissingIdentity)
        );
    }

    #[tokio::test]
    async fn test_update_non_2xx_is_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2/things/tok-123?broadcast=true")
            .with_status(500)
            .with_body("oops")
            .create_async()
            .await;

        let client = RegistryClient::with_base_url(server.url());
        let err = client
            .update("tok-123", &[ValueEntry::new("tmp", 26.26)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
