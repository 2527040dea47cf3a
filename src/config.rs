use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVIDER_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_REGISTRY_URL: &str = "https://api.thethings.io";

/// Pipeline configuration. Everything tunable lives here; nothing is
/// hardcoded in the stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Geolocation provider API key.
    pub provider_api_key: String,
    /// Geolocation provider base URL.
    pub provider_url: String,
    /// Device registry base URL.
    pub registry_url: String,
    /// External push endpoint. Unset disables the external push entirely.
    pub push_url: Option<String>,
    /// Staleness window applied by the dispatcher before routing.
    pub dispatch_window_ms: i64,
    /// Staleness window applied by the transform stage.
    pub transform_window_ms: i64,
    /// Staleness window applied by the persist + push stage.
    pub push_window_ms: i64,
    /// Listen address for the trigger adapter.
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_api_key: String::new(),
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            push_url: None,
            dispatch_window_ms: 2000,
            transform_window_ms: 4000,
            push_window_ms: 4000,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    /// Build from env vars, falling back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("GEORELAY_PROVIDER_API_KEY") {
            cfg.provider_api_key = v;
        }
        if let Ok(v) = std::env::var("GEORELAY_PROVIDER_URL") {
            cfg.provider_url = v;
        }
        if let Ok(v) = std::env::var("GEORELAY_REGISTRY_URL") {
            cfg.registry_url = v;
        }
        if let Ok(v) = std::env::var("GEORELAY_PUSH_URL") {
            if !v.is_empty() {
                cfg.push_url = Some(v);
            }
        }
        if let Ok(v) = std::env::var("GEORELAY_DISPATCH_WINDOW_MS") {
            if let Ok(n) = v.parse::<i64>() {
                cfg.dispatch_window_ms = n;
            }
        }
        if let Ok(v) = std::env::var("GEORELAY_TRANSFORM_WINDOW_MS") {
            if let Ok(n) = v.parse::<i64>() {
                cfg.transform_window_ms = n;
            }
        }
        if let Ok(v) = std::env::var("GEORELAY_PUSH_WINDOW_MS") {
            if let Ok(n) = v.parse::<i64>() {
                cfg.push_window_ms = n;
            }
        }
        if let Ok(v) = std::env::var("GEORELAY_BIND_ADDR") {
            cfg.bind_addr = v;
        }

        cfg
    }
}
