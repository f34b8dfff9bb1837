//! Facturacion worker - fiscal authorization of committed sales
//!
//! Consumes `jobs:facturacion`, calls the AFIP sidecar through the shared
//! circuit breaker and settles the comprobante. Failures schedule a retry
//! with exponential backoff; the retry budget exhausting moves the record to
//! `error` and pushes a dead-letter entry.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use shared::money::round2;
use shared::{AppError, ErrorCode};

use super::dispatcher::{EmailJobPayload, FacturacionJobPayload};
use super::{dlq, QUEUE_FACTURACION};
use crate::db::models::{Comprobante, TipoComprobante, VentaCompleta};
use crate::db::repository::{comprobante, producto, venta};
use crate::infra::afip::{importe_to_f64, parse_fecha_cae, AfipPayload, AfipResponse};
use crate::state::AppState;

/// Retry budget before a comprobante settles in `error` and goes to the DLQ
pub const MAX_COMPROBANTE_RETRIES: i32 = 10;

/// Exponential backoff: 30s, 1m, 2m, 4m, 8m, 16m, 32m, 60m (capped)
pub fn backoff(retry_count: i32) -> Duration {
    const BASE_SECS: u64 = 30;
    const MAX_SECS: u64 = 3600;
    let exp = retry_count.saturating_sub(1).clamp(0, 16) as u32;
    Duration::from_secs((BASE_SECS << exp).min(MAX_SECS))
}

/// Entry point for one facturacion job
pub async fn handle(state: AppState, raw_payload: serde_json::Value) {
    let payload: FacturacionJobPayload = match serde_json::from_value(raw_payload) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "facturacion: invalid payload");
            return;
        }
    };

    let venta_id = match payload.venta_id.parse::<uuid::Uuid>() {
        Ok(id) => id,
        Err(_) => {
            tracing::error!(venta_id = %payload.venta_id, "facturacion: invalid venta_id");
            return;
        }
    };

    let venta = match venta::find_by_id(&state.pool, venta_id).await {
        Ok(Some(v)) => v,
        Ok(None) => {
            tracing::error!(venta_id = %venta_id, "facturacion: venta not found, dropping job");
            return;
        }
        Err(e) => {
            tracing::error!(venta_id = %venta_id, error = %e, "facturacion: failed to load venta");
            return;
        }
    };

    // Internal ticket: net equals the sale total, no tax split
    let comp = match comprobante::create(
        &state.pool,
        comprobante::NuevoComprobante {
            venta_id,
            tipo: TipoComprobante::TicketInterno.as_str().to_string(),
            punto_de_venta: state.config.punto_venta_fiscal,
            monto_neto: round2(venta.venta.total),
            monto_iva: rust_decimal::Decimal::ZERO,
            monto_total: round2(venta.venta.total),
        },
    )
    .await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(venta_id = %venta_id, error = %e, "facturacion: failed to create comprobante");
            return;
        }
    };

    let afip_payload = build_afip_payload(&state, &comp);
    let resultado = state
        .breaker
        .execute(|| async { state.afip.facturar(&afip_payload).await })
        .await;

    aplicar_resultado(&state, &comp, resultado).await;

    // Document + email are best-effort and independent of the authority call
    let pdf_path = generar_documento(&state, &venta, comp.id).await;
    if let (Some(email), Some(path)) = (payload.cliente_email.as_deref(), pdf_path.as_deref()) {
        encolar_email(&state, &venta, email, path).await;
    }
}

/// Authorization request for a comprobante (also used by the retry scheduler)
pub fn build_afip_payload(state: &AppState, comp: &Comprobante) -> AfipPayload {
    AfipPayload {
        cuit_emisor: state.config.cuit_emisor.clone(),
        punto_de_venta: comp.punto_de_venta,
        tipo_comprobante: TipoComprobante::TicketInterno.codigo_afip(),
        tipo_doc_receptor: 99,
        nro_doc_receptor: "0".to_string(),
        concepto: 1,
        importe_neto: importe_to_f64(comp.monto_neto),
        importe_exento: 0.0,
        importe_iva: importe_to_f64(comp.monto_iva),
        importe_total: importe_to_f64(comp.monto_total),
        venta_id: comp.venta_id.to_string(),
    }
}

/// Settle a comprobante from the outcome of one authority attempt.
///
/// Shared by the primary worker and the retry scheduler; every transition
/// out of `pendiente` is terminal and idempotent under re-application.
pub async fn aplicar_resultado(
    state: &AppState,
    comp: &Comprobante,
    resultado: Result<AfipResponse, AppError>,
) {
    match resultado {
        Ok(resp) if resp.aprobado() => {
            let vencimiento = parse_fecha_cae(&resp.cae_vencimiento);
            if let Err(e) =
                comprobante::marcar_emitido(&state.pool, comp.id, &resp.cae, vencimiento).await
            {
                tracing::error!(comprobante_id = %comp.id, error = %e,
                    "facturacion: failed to persist emitido");
                return;
            }
            tracing::info!(cae = %resp.cae, venta_id = %comp.venta_id,
                "facturacion: CAE obtained");
        }
        Ok(resp) => {
            let obs = format!(
                "AFIP rechazó el comprobante: resultado={}",
                resp.resultado
            );
            if let Err(e) = comprobante::marcar_rechazado(&state.pool, comp.id, &obs).await {
                tracing::error!(comprobante_id = %comp.id, error = %e,
                    "facturacion: failed to persist rechazado");
                return;
            }
            tracing::warn!(resultado = %resp.resultado, venta_id = %comp.venta_id,
                "facturacion: authority rejected");
        }
        Err(err) => {
            let retry_count = comp.retry_count + 1;
            let agotado = retry_count >= MAX_COMPROBANTE_RETRIES;
            let next_retry = if agotado {
                None
            } else {
                Some(Utc::now() + backoff(retry_count))
            };

            if err.code == ErrorCode::CircuitOpen {
                tracing::warn!(venta_id = %comp.venta_id, "facturacion: circuit open, deferring");
            } else {
                tracing::error!(venta_id = %comp.venta_id, error = %err.message,
                    "facturacion: authority call failed");
            }

            if let Err(e) = comprobante::registrar_fallo(
                &state.pool,
                comp.id,
                retry_count,
                next_retry,
                &err.message,
                agotado,
            )
            .await
            {
                tracing::error!(comprobante_id = %comp.id, error = %e,
                    "facturacion: failed to persist retry state");
                return;
            }

            if agotado {
                tracing::error!(comprobante_id = %comp.id, venta_id = %comp.venta_id,
                    retries = retry_count, "facturacion: max retries exceeded, moving to error");
                dlq::send_to_dlq(
                    &state.broker,
                    QUEUE_FACTURACION,
                    "facturacion",
                    serde_json::json!({
                        "venta_id": comp.venta_id,
                        "comprobante_id": comp.id,
                    }),
                    &format!(
                        "max retries ({MAX_COMPROBANTE_RETRIES}) exceeded: {}",
                        err.message
                    ),
                    retry_count,
                )
                .await;
            }
        }
    }
}

/// Render and store the ticket document; returns the stored path
async fn generar_documento(
    state: &AppState,
    venta: &VentaCompleta,
    comprobante_id: uuid::Uuid,
) -> Option<String> {
    let mut nombres = HashMap::new();
    for item in &venta.items {
        if let Ok(Some(p)) = producto::find_by_id(&state.pool, item.producto_id).await {
            nombres.insert(item.producto_id, p.nombre);
        }
    }

    let bytes = crate::infra::ticket::render_ticket(venta, &nombres);
    let path = match crate::infra::ticket::write_ticket(
        &state.config.pdf_storage_path,
        venta.venta.numero_ticket,
        &bytes,
    )
    .await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(venta_id = %venta.venta.id, error = %e,
                "facturacion: document generation failed");
            return None;
        }
    };

    if let Err(e) = comprobante::set_pdf_path(&state.pool, comprobante_id, &path).await {
        tracing::error!(comprobante_id = %comprobante_id, error = %e,
            "facturacion: failed to persist document path");
    }
    Some(path)
}

async fn encolar_email(state: &AppState, venta: &VentaCompleta, email: &str, pdf_path: &str) {
    let job = EmailJobPayload {
        to_email: email.to_string(),
        subject: format!("Comprobante Tango POS — Ticket #{}", venta.venta.numero_ticket),
        body: format!(
            "Gracias por su compra.\nTotal: ${}\nSu comprobante está disponible en {}.",
            round2(venta.venta.total),
            state.config.host_domain,
        ),
        pdf_path: Some(pdf_path.to_string()),
    };
    if let Err(e) = state.dispatcher.enqueue_email(&job).await {
        tracing::warn!(email, error = %e.message, "facturacion: failed to enqueue email");
    } else {
        tracing::info!(email, "facturacion: email job enqueued");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff(1), Duration::from_secs(30));
        assert_eq!(backoff(2), Duration::from_secs(60));
        assert_eq!(backoff(3), Duration::from_secs(120));
        assert_eq!(backoff(7), Duration::from_secs(1920));
        assert_eq!(backoff(8), Duration::from_secs(3600));
        assert_eq!(backoff(10), Duration::from_secs(3600));
        assert_eq!(backoff(100), Duration::from_secs(3600));
    }

    #[test]
    fn test_backoff_never_underflows() {
        assert_eq!(backoff(0), Duration::from_secs(30));
        assert_eq!(backoff(-3), Duration::from_secs(30));
    }
}
