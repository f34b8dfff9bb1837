//! Receipt control operations
//!
//! Read side of the async pipeline plus the two operator controls: annulling
//! an issued receipt and resetting a failed one for retry.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use crate::db::db_err;
use crate::db::models::{
    Comprobante, ESTADO_EMITIDO, ESTADO_ERROR, ESTADO_RECHAZADO,
};
use crate::db::repository::comprobante;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ComprobanteResponse {
    pub id: Uuid,
    pub venta_id: Uuid,
    pub tipo: String,
    pub numero: Option<i64>,
    pub punto_de_venta: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cae: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cae_vencimiento: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receptor_cuit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receptor_nombre: Option<String>,
    pub monto_neto: Decimal,
    pub monto_iva: Decimal,
    pub monto_total: Decimal,
    pub estado: String,
    pub retry_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl From<Comprobante> for ComprobanteResponse {
    fn from(c: Comprobante) -> Self {
        let pdf_url = c
            .pdf_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|_| format!("/v1/facturacion/pdf/{}", c.id));
        Self {
            id: c.id,
            venta_id: c.venta_id,
            tipo: c.tipo,
            numero: c.numero,
            punto_de_venta: c.punto_de_venta,
            cae: c.cae,
            cae_vencimiento: c.cae_vencimiento,
            receptor_cuit: c.receptor_cuit,
            receptor_nombre: c.receptor_nombre,
            monto_neto: c.monto_neto,
            monto_iva: c.monto_iva,
            monto_total: c.monto_total,
            estado: c.estado,
            retry_count: c.retry_count,
            observaciones: c.observaciones,
            pdf_url,
        }
    }
}

/// The receipt associated with a sale - the polling endpoint behind the
/// async authorization
pub async fn obtener_por_venta(
    state: &AppState,
    venta_id: Uuid,
) -> AppResult<ComprobanteResponse> {
    comprobante::find_by_venta_id(&state.pool, venta_id)
        .await
        .map_err(db_err)?
        .map(Into::into)
        .ok_or_else(|| AppError::not_found("comprobante"))
}

/// Path of the generated document for download
pub async fn obtener_pdf_path(state: &AppState, id: Uuid) -> AppResult<String> {
    let comp = find(state, id).await?;
    comp.pdf_path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::NotFound,
                format!("PDF no disponible — el comprobante está en estado '{}'", comp.estado),
            )
        })
}

/// `emitido` → `anulado`. Any other state is refused.
pub async fn anular(
    state: &AppState,
    id: Uuid,
    motivo: &str,
) -> AppResult<ComprobanteResponse> {
    let comp = find(state, id).await?;

    if comp.estado != ESTADO_EMITIDO {
        return Err(AppError::invalid_request(format!(
            "solo se puede anular un comprobante emitido (estado actual: {})",
            comp.estado
        )));
    }

    comprobante::marcar_anulado(&state.pool, id, &format!("Anulado: {motivo}"))
        .await
        .map_err(db_err)?;

    tracing::info!(comprobante_id = %id, "comprobante annulled");
    find(state, id).await.map(Into::into)
}

/// `error` | `rechazado` → `pendiente`, retry counter cleared and due now so
/// the scheduler picks it up on its next tick
pub async fn reintentar(state: &AppState, id: Uuid) -> AppResult<ComprobanteResponse> {
    let comp = find(state, id).await?;

    if comp.estado != ESTADO_ERROR && comp.estado != ESTADO_RECHAZADO {
        return Err(AppError::invalid_request(format!(
            "solo se puede reintentar un comprobante en error o rechazado (estado actual: {})",
            comp.estado
        )));
    }

    comprobante::resetear_para_reintento(&state.pool, id)
        .await
        .map_err(db_err)?;

    tracing::info!(comprobante_id = %id, "comprobante reset for retry");
    find(state, id).await.map(Into::into)
}

async fn find(state: &AppState, id: Uuid) -> AppResult<Comprobante> {
    comprobante::find_by_id(&state.pool, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("comprobante"))
}
