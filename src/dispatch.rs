//! Value-pipeline dispatcher: the decision core.
//!
//! One inbound trigger event produces exactly one decision, then the
//! dispatcher hands off to the chosen stage with a detached task and
//! returns immediately. The hosting trigger budget (~2 s) is far shorter
//! than the stage budget (~20 s), so the dispatcher never waits on,
//! retries, or propagates errors from the stage it invoked; stage
//! failures are logged inside the spawned task and swallowed.

use crate::config::Config;
use crate::event::{find, is_truthy, Action, TriggerEvent};
use crate::freshness::check_fresh;
use crate::geolocate::{location_values, GeolocationClient};
use crate::metrics::DispatchMetrics;
use crate::push::PushClient;
use crate::registry::RegistryClient;
use crate::transform;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Terminal outcome of one dispatcher invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Not a write, or no values. No-op, not an error.
    Skip,
    /// Batch older than the dispatch window. Dropped silently.
    Expired,
    /// WiFi sightings present; resolve a location.
    Geolocate,
    /// Raw readings not yet transformed.
    Transform,
    /// Already transformed; persist and push externally.
    Deliver,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Skip => "skip",
            Decision::Expired => "expired",
            Decision::Geolocate => "geolocate",
            Decision::Transform => "transform",
            Decision::Deliver => "deliver",
        }
    }
}

/// Choose the pipeline stage for a batch. First match wins.
///
/// Stamps a timestamp on batches that lack one (via the staleness
/// guard), so the decision may extend the value set.
pub fn decide(event: &mut TriggerEvent, now_ms: i64, window_ms: i64) -> Decision {
    if event.action != Action::Write || event.values.is_empty() {
        return Decision::Skip;
    }
    if !check_fresh(&mut event.values, now_ms, window_ms) {
        return Decision::Expired;
    }
    if is_truthy(find(&event.values, "ssid0")) && is_truthy(find(&event.values, "rssi0")) {
        return Decision::Geolocate;
    }
    if !is_truthy(find(&event.values, "transformed")) {
        return Decision::Transform;
    }
    Decision::Deliver
}

/// Routes inbound trigger events to pipeline stages.
pub struct Dispatcher {
    config: Config,
    geolocation: Arc<GeolocationClient>,
    registry: Arc<RegistryClient>,
    push: Arc<PushClient>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    /// Build a dispatcher with clients derived from `config`.
    pub fn new(config: Config, metrics: Arc<DispatchMetrics>) -> Self {
        let geolocation = Arc::new(GeolocationClient::with_base_url(
            config.provider_api_key.clone(),
            config.provider_url.clone(),
        ));
        let registry = Arc::new(RegistryClient::with_base_url(config.registry_url.clone()));
        let push = Arc::new(PushClient::new(config.push_url.clone()));
        Self {
            config,
            geolocation,
            registry,
            push,
            metrics,
        }
    }

    /// Decide and hand off, without blocking on the stage.
    ///
    /// Returns the decision as soon as the stage task is spawned; there
    /// is no ordering guarantee between this return and the spawned
    /// stage's eventual completion.
    pub fn dispatch(&self, mut event: TriggerEvent) -> Decision {
        let dispatch_id = Uuid::new_v4();
        let now = Utc::now().timestamp_millis();
        let decision = decide(&mut event, now, self.config.dispatch_window_ms);
        self.metrics.record(decision);

        match decision {
            Decision::Skip => {
                debug!(dispatch_id = %dispatch_id, "Ignoring non-write or empty event");
            }
            Decision::Expired => {
                info!(
                    dispatch_id = %dispatch_id,
                    thing_token = %event.thing_token,
                    "Batch expired, dropping"
                );
            }
            Decision::Geolocate => {
                info!(
                    dispatch_id = %dispatch_id,
                    thing_token = %event.thing_token,
                    "Forwarding to geolocation stage"
                );
                let stage = self.stage_handles();
                tokio::spawn(async move {
                    if let Err(e) = stage.run_geolocate(&event).await {
                        error!(
                            dispatch_id = %dispatch_id,
                            thing_token = %event.thing_token,
                            error = %e,
                            "Geolocation stage failed"
                        );
                    }
                });
            }
            Decision::Transform => {
                info!(
                    dispatch_id = %dispatch_id,
                    thing_token = %event.thing_token,
                    "Forwarding to transform stage"
                );
                let stage = self.stage_handles();
                tokio::spawn(async move {
                    if let Err(e) = stage.run_transform(&mut event).await {
                        error!(
                            dispatch_id = %dispatch_id,
                            thing_token = %event.thing_token,
                            error = %e,
                            "Transform stage failed"
                        );
                    }
                });
            }
            Decision::Deliver => {
                info!(
                    dispatch_id = %dispatch_id,
                    thing_token = %event.thing_token,
                    "Forwarding to deliver stage"
                );
                let stage = self.stage_handles();
                tokio::spawn(async move {
                    if let Err(e) = stage.run_deliver(&mut event).await {
                        error!(
                            dispatch_id = %dispatch_id,
                            thing_token = %event.thing_token,
                            error = %e,
                            "Deliver stage failed"
                        );
                    }
                });
            }
        }

        decision
    }

    fn stage_handles(&self) -> StageHandles {
        StageHandles {
            config: self.config.clone(),
            geolocation: Arc::clone(&self.geolocation),
            registry: Arc::clone(&self.registry),
            push: Arc::clone(&self.push),
        }
    }
}

/// Clients and windows a detached stage task needs; cheap to clone into
/// the spawned future.
pub struct StageHandles {
    config: Config,
    geolocation: Arc<GeolocationClient>,
    registry: Arc<RegistryClient>,
    push: Arc<PushClient>,
}

impl StageHandles {
    /// Build stage handles directly from clients (used by tests to point
    /// at mock servers).
    pub fn new(
        config: Config,
        geolocation: Arc<GeolocationClient>,
        registry: Arc<RegistryClient>,
        push: Arc<PushClient>,
    ) -> Self {
        Self {
            config,
            geolocation,
            registry,
            push,
        }
    }

    /// Geolocation stage: resolve a location from the batch's WiFi
    /// sightings and record it in the registry as the `device` and
    /// `geolocation_accuracy` values.
    pub async fn run_geolocate(&self, event: &TriggerEvent) -> Result<()> {
        let resolved = self.geolocation.locate(&event.values).await?;
        info!(
            thing_token = %event.thing_token,
            lat = resolved.location.lat,
            lng = resolved.location.lng,
            accuracy = resolved.accuracy,
            "Geolocation resolved"
        );
        let values = location_values(&event.values, &resolved);
        self.registry.update(&event.thing_token, &values).await
    }

    /// Transform stage: guard freshness, apply the temperature
    /// transform once, then deliver the updated batch.
    pub async fn run_transform(&self, event: &mut TriggerEvent) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        if !check_fresh(&mut event.values, now, self.config.transform_window_ms) {
            info!(thing_token = %event.thing_token, "Transform dropped, batch expired");
            return Ok(());
        }
        if !transform::apply(&mut event.values) {
            debug!(thing_token = %event.thing_token, "Batch already transformed");
            return Ok(());
        }
        self.run_deliver(event).await
    }

    /// Deliver stage: persist the batch to the registry and push it to
    /// the external endpoint. Each leg is attempted exactly once; a
    /// registry failure does not prevent the push.
    pub async fn run_deliver(&self, event: &mut TriggerEvent) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        if !check_fresh(&mut event.values, now, self.config.push_window_ms) {
            info!(thing_token = %event.thing_token, "Delivery dropped, batch expired");
            return Ok(());
        }
        if let Err(e) = self.registry.update(&event.thing_token, &event.values).await {
            error!(
                thing_token = %event.thing_token,
                error = %e,
                "Registry update failed"
            );
        }
        self.push.push(&event.values).await
    }
}
