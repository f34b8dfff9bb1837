//! Health endpoint
//!
//! Reports database, broker and breaker state. 503 when a hard dependency
//! (database or broker) is unreachable; the breaker state is informational -
//! an open breaker does not fail health because sales keep committing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub db: bool,
    pub redis: bool,
    /// closed | open | half_open
    pub afip_cb: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let redis = state.broker.ping().await.is_ok();

    let ok = db && redis;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            ok,
            db,
            redis,
            afip_cb: state.breaker.state().as_str(),
        }),
    )
}
