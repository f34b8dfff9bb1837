//! Sale endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db::models::Rol;
use crate::services::venta::{
    self, ListVentasQuery, RegistrarVentaRequest, SyncBatchRequest, SyncVentaResultado,
    VentaListResponse, VentaResponse,
};
use crate::state::AppState;

const TODOS: &[Rol] = &[Rol::Cajero, Rol::Supervisor, Rol::Administrador];

/// POST /v1/ventas
pub async fn registrar(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<RegistrarVentaRequest>,
) -> Result<(StatusCode, Json<VentaResponse>), shared::AppError> {
    actor.require_rol(TODOS)?;
    let resp = venta::registrar_venta(&state, actor.id, req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[derive(Debug, Deserialize)]
pub struct AnularVentaRequest {
    pub motivo: Option<String>,
}

/// DELETE /v1/ventas/{id}
pub async fn anular(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    body: Option<Json<AnularVentaRequest>>,
) -> Result<StatusCode, shared::AppError> {
    actor.require_rol(&[Rol::Supervisor, Rol::Administrador])?;
    let motivo = body
        .and_then(|Json(b)| b.motivo)
        .unwrap_or_else(|| "sin motivo".to_string());
    venta::anular_venta(&state, id, &motivo).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/ventas
pub async fn listar(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<ListVentasQuery>,
) -> ApiResult<VentaListResponse> {
    actor.require_rol(TODOS)?;
    venta::listar_ventas(&state, query).await.map(Json)
}

/// POST /v1/ventas/sync-batch
pub async fn sync_batch(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<SyncBatchRequest>,
) -> ApiResult<Vec<SyncVentaResultado>> {
    actor.require_rol(TODOS)?;
    venta::sync_batch(&state, actor.id, req).await.map(Json)
}
