//! Process probes.
//!
//! Served on public routes: no credential, no tenant context. The body
//! carries process state only, never tenant data.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::network::HealthState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub state: &'static str,
    pub node_id: String,
    pub in_flight: u64,
    pub uptime_secs: u64,
}

/// Always 200; `state` says whether the node takes traffic, so a draining
/// node is distinguishable from a dead one.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        state: state.shutdown.health_state().as_str(),
        node_id: state.operations.config().node_id.clone(),
        in_flight: state.shutdown.in_flight_count(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Process is up. Deliberately ignores health state: a failing liveness
/// probe restarts the process.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// 200 only while `Ready`; 503 while starting, draining, or stopped.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    match state.shutdown.health_state() {
        HealthState::Ready => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}
