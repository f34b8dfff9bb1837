//! Inventory endpoints - links, manual disassembly, alerts, adjustments

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db::models::Rol;
use crate::services::inventario::{
    self, AjusteManualRequest, AjusteManualResponse, AlertaStockResponse, CrearVinculoRequest,
    DesarmeManualRequest, DesarmeManualResponse, VinculoResponse,
};
use crate::state::AppState;

const GESTORES: &[Rol] = &[Rol::Supervisor, Rol::Administrador];

/// POST /v1/inventario/vinculos
pub async fn crear_vinculo(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<CrearVinculoRequest>,
) -> Result<(StatusCode, Json<VinculoResponse>), shared::AppError> {
    actor.require_rol(GESTORES)?;
    let resp = inventario::crear_vinculo(&state, req).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /v1/inventario/vinculos
pub async fn listar_vinculos(
    State(state): State<AppState>,
    actor: CurrentUser,
) -> ApiResult<Vec<VinculoResponse>> {
    actor.require_rol(GESTORES)?;
    inventario::listar_vinculos(&state).await.map(Json)
}

/// POST /v1/inventario/desarme
pub async fn desarme_manual(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<DesarmeManualRequest>,
) -> ApiResult<DesarmeManualResponse> {
    actor.require_rol(GESTORES)?;
    inventario::desarme_manual(&state, req).await.map(Json)
}

/// POST /v1/inventario/ajuste
pub async fn ajuste_manual(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<AjusteManualRequest>,
) -> ApiResult<AjusteManualResponse> {
    actor.require_rol(GESTORES)?;
    inventario::ajuste_manual(&state, req).await.map(Json)
}

/// GET /v1/inventario/alertas
pub async fn alertas(
    State(state): State<AppState>,
    actor: CurrentUser,
) -> ApiResult<Vec<AlertaStockResponse>> {
    actor.require_rol(GESTORES)?;
    inventario::alertas_stock(&state).await.map(Json)
}
