// Inbound event model and value-set accessors
pub mod event;

// Staleness guard for batch timestamps
pub mod freshness;

// Raw ADC to temperature transformation
pub mod transform;

// WiFi geolocation provider client
pub mod geolocate;

// Device registry updater
pub mod registry;

// External push endpoint client
pub mod push;

// Value-pipeline dispatcher (decision core)
pub mod dispatch;

// Dispatch outcome counters
pub mod metrics;

// Configuration
pub mod config;

// HTTP trigger adapter
pub mod api;
