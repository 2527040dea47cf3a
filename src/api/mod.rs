//! HTTP trigger adapter.
//!
//! The hosting event system delivers device writes here. The adapter
//! holds no pipeline logic: it hands the event to the dispatcher and
//! answers as soon as the decision is made, long before any spawned
//! stage completes.

use crate::dispatch::Dispatcher;
use crate::event::TriggerEvent;
use crate::metrics::DispatchMetrics;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Arc<DispatchMetrics>,
}

#[derive(Serialize)]
struct TriggerResponse {
    decision: &'static str,
}

/// Create the trigger adapter router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/trigger", post(handle_trigger))
        .route("/stats", get(get_stats))
        .with_state(state)
}

/// POST /trigger - dispatch one inbound event
async fn handle_trigger(
    State(state): State<AppState>,
    Json(event): Json<TriggerEvent>,
) -> impl IntoResponse {
    let decision = state.dispatcher.dispatch(event);
    (
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            decision: decision.as_str(),
        }),
    )
}

/// GET /stats - dispatch counters
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
