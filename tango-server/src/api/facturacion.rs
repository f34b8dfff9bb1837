//! Receipt endpoints - polling, document download and operator controls

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use shared::AppError;
use uuid::Uuid;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db::models::Rol;
use crate::services::facturacion::{self, ComprobanteResponse};
use crate::state::AppState;

const OPERADORES: &[Rol] = &[Rol::Supervisor, Rol::Administrador];

/// GET /v1/facturacion/{venta_id} - poll the authorization outcome of a sale
pub async fn por_venta(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(venta_id): Path<Uuid>,
) -> ApiResult<ComprobanteResponse> {
    actor.require_rol(OPERADORES)?;
    facturacion::obtener_por_venta(&state, venta_id).await.map(Json)
}

/// GET /v1/facturacion/pdf/{id} - stream the generated ticket document
pub async fn descargar_pdf(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    actor.require_rol(OPERADORES)?;
    let path = facturacion::obtener_pdf_path(&state, id).await?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(path, error = %e, "failed to read ticket document");
        AppError::not_found("documento")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"comprobante_{id}.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct AnularComprobanteRequest {
    pub motivo: Option<String>,
}

/// DELETE /v1/facturacion/{id} - only legal from `emitido`
pub async fn anular(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    body: Option<Json<AnularComprobanteRequest>>,
) -> ApiResult<ComprobanteResponse> {
    actor.require_rol(OPERADORES)?;
    let motivo = body
        .and_then(|Json(b)| b.motivo)
        .unwrap_or_else(|| "sin motivo".to_string());
    facturacion::anular(&state, id, &motivo).await.map(Json)
}

/// POST /v1/facturacion/{id}/reintentar - only legal from `error` | `rechazado`
pub async fn reintentar(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ComprobanteResponse>), AppError> {
    actor.require_rol(OPERADORES)?;
    let resp = facturacion::reintentar(&state, id).await?;
    Ok((StatusCode::OK, Json(resp)))
}
