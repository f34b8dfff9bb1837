//! Authentication endpoints: login and refresh

use axum::extract::State;
use axum::Json;

use super::ApiResult;
use crate::services::auth::{self, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse};
use crate::state::AppState;

/// POST /v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    auth::login(&state, req).await.map(Json)
}

/// POST /v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<RefreshResponse> {
    auth::refresh(&state, req).await.map(Json)
}
