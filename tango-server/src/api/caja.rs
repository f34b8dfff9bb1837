//! Cash-session endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db::models::Rol;
use crate::services::caja::{
    self, AbrirCajaRequest, ArqueoRequest, ArqueoResponse, MovimientoManualRequest,
    ReporteCajaResponse,
};
use crate::state::AppState;

const TODOS: &[Rol] = &[Rol::Cajero, Rol::Supervisor, Rol::Administrador];

/// POST /v1/caja/abrir
pub async fn abrir(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<AbrirCajaRequest>,
) -> Result<(StatusCode, Json<ReporteCajaResponse>), shared::AppError> {
    actor.require_rol(TODOS)?;
    let resp = caja::abrir(&state, actor.id, req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /v1/caja/arqueo - blind close of the caller's (or the named) session
pub async fn arqueo(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<ArqueoRequest>,
) -> ApiResult<ArqueoResponse> {
    actor.require_rol(TODOS)?;
    caja::arqueo(&state, actor.id, req).await.map(Json)
}

/// POST /v1/caja/movimiento
pub async fn movimiento(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<MovimientoManualRequest>,
) -> Result<StatusCode, shared::AppError> {
    actor.require_rol(TODOS)?;
    caja::registrar_movimiento(&state, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/caja/activa - the caller's open session, 404 when none
pub async fn activa(
    State(state): State<AppState>,
    actor: CurrentUser,
) -> ApiResult<ReporteCajaResponse> {
    actor.require_rol(TODOS)?;
    caja::activa(&state, actor.id)
        .await?
        .map(Json)
        .ok_or_else(|| shared::AppError::not_found("sesión de caja activa"))
}

/// GET /v1/caja/{id}/reporte
pub async fn reporte(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ReporteCajaResponse> {
    actor.require_rol(TODOS)?;
    caja::reporte(&state, id).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct HistorialQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /v1/caja/historial
pub async fn historial(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<HistorialQuery>,
) -> ApiResult<Vec<ReporteCajaResponse>> {
    actor.require_rol(&[Rol::Supervisor, Rol::Administrador])?;
    caja::historial(
        &state,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(20),
    )
    .await
    .map(Json)
}
