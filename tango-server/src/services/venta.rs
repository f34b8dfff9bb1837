//! Sale service - atomic commit, cancellation, offline sync, listing
//!
//! A sale either commits completely (ticket number, aggregate, stock
//! decrements with their movements, cash movements) or never happened. The
//! receipt-authorization job is enqueued after the commit and is never
//! allowed to fail the sale.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::money::round2;
use shared::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use crate::db::db_err;
use crate::db::models::{
    MetodoPago, TipoMovimientoCaja, Venta, VentaCompleta, VentaItem, VentaPago,
    ESTADO_ANULADA, ESTADO_COMPLETADA,
};
use crate::db::repository::caja::{self, NuevoMovimiento};
use crate::db::repository::{producto, venta};
use crate::services::inventario;
use crate::state::AppState;
use crate::workers::dispatcher::FacturacionJobPayload;

/// Max auto-compensable deficit per item in an offline batch
pub const COMPENSATION_THRESHOLD: i32 = 3;
/// Max fraction of a batch allowed to count as stock conflicts
pub const MAX_CONFLICT_RATIO: f64 = 0.5;

// ==================== DTOs ====================

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarVentaRequest {
    pub sesion_caja_id: Uuid,
    pub items: Vec<ItemVentaRequest>,
    pub pagos: Vec<PagoRequest>,
    #[serde(default)]
    pub offline_id: Option<String>,
    #[serde(default)]
    pub cliente_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemVentaRequest {
    pub producto_id: Uuid,
    pub cantidad: i32,
    #[serde(default)]
    pub descuento: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagoRequest {
    pub metodo: MetodoPago,
    pub monto: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemVentaResponse {
    pub producto_id: Uuid,
    pub producto: String,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub descuento: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PagoResponse {
    pub metodo: String,
    pub monto: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct VentaResponse {
    pub id: Uuid,
    pub numero_ticket: i64,
    pub sesion_caja_id: Uuid,
    pub items: Vec<ItemVentaResponse>,
    pub pagos: Vec<PagoResponse>,
    pub subtotal: Decimal,
    pub descuento_total: Decimal,
    pub total: Decimal,
    pub vuelto: Decimal,
    pub estado: String,
    pub conflicto_stock: bool,
    pub created_at: DateTime<Utc>,
}

// ==================== Pure pre-flight math ====================

#[derive(Debug, Clone)]
struct ItemResuelto {
    producto_id: Uuid,
    nombre: String,
    precio: Decimal,
    cantidad: i32,
    descuento: Decimal,
    subtotal: Decimal,
}

fn linea_subtotal(precio: Decimal, cantidad: i32, descuento: Decimal) -> Decimal {
    round2(precio * Decimal::from(cantidad) - descuento)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Totales {
    subtotal: Decimal,
    descuento_total: Decimal,
    total: Decimal,
}

fn calcular_totales(items: &[ItemResuelto]) -> Totales {
    let subtotal: Decimal = items.iter().map(|i| i.subtotal).sum();
    let descuento_total: Decimal = items.iter().map(|i| i.descuento).sum();
    Totales {
        subtotal,
        descuento_total,
        total: subtotal,
    }
}

/// Conflict budget for an offline batch: `ceil(batch_size × ratio)`
fn max_conflictos(batch_size: usize) -> usize {
    ((batch_size as f64) * MAX_CONFLICT_RATIO).ceil() as usize
}

fn validar_request(req: &RegistrarVentaRequest) -> AppResult<()> {
    if req.items.is_empty() {
        return Err(AppError::validation("la venta requiere al menos un item")
            .with_field("items", "required"));
    }
    if req.pagos.is_empty() {
        return Err(AppError::validation("la venta requiere al menos un pago")
            .with_field("pagos", "required"));
    }
    for item in &req.items {
        if item.cantidad < 1 {
            return Err(AppError::validation("cantidad debe ser al menos 1")
                .with_field("cantidad", "min"));
        }
        if item.descuento < Decimal::ZERO {
            return Err(AppError::validation("descuento no puede ser negativo")
                .with_field("descuento", "min"));
        }
    }
    for pago in &req.pagos {
        if pago.monto <= Decimal::ZERO {
            return Err(
                AppError::validation("monto de pago debe ser positivo").with_field("monto", "min")
            );
        }
    }
    Ok(())
}

// ==================== RegisterSale ====================

pub async fn registrar_venta(
    state: &AppState,
    usuario_id: Uuid,
    req: RegistrarVentaRequest,
) -> AppResult<VentaResponse> {
    validar_request(&req)?;

    // Session must exist and be open
    let sesion = caja::find_sesion_by_id(&state.pool, req.sesion_caja_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("sesión de caja"))?;
    if !sesion.is_abierta() {
        return Err(AppError::new(ErrorCode::ClosedSession));
    }

    // Idempotent replay for offline sales
    if let Some(offline_id) = req.offline_id.as_deref() {
        if let Some(existente) = venta::find_by_offline_id(&state.pool, offline_id)
            .await
            .map_err(db_err)?
        {
            tracing::info!(offline_id, venta_id = %existente.venta.id, "offline replay, returning existing sale");
            return venta_to_response(state, &existente).await;
        }
    }

    // Resolve products and compute totals outside the transaction
    let mut resueltos = Vec::with_capacity(req.items.len());
    let mut conflicto_stock = false;
    for item in &req.items {
        let prod = producto::find_by_id(&state.pool, item.producto_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::not_found("producto"))?;
        if !prod.activo {
            return Err(AppError::with_message(
                ErrorCode::InactiveProduct,
                format!("producto {} está inactivo y no puede venderse", prod.nombre),
            ));
        }
        if prod.stock_actual < item.cantidad {
            conflicto_stock = true;
        }
        resueltos.push(ItemResuelto {
            producto_id: prod.id,
            nombre: prod.nombre,
            precio: prod.precio_venta,
            cantidad: item.cantidad,
            descuento: item.descuento,
            subtotal: linea_subtotal(prod.precio_venta, item.cantidad, item.descuento),
        });
    }

    let totales = calcular_totales(&resueltos);
    let total_pagos: Decimal = req.pagos.iter().map(|p| p.monto).sum();
    if total_pagos < totales.total {
        return Err(AppError::new(ErrorCode::InsufficientPayment));
    }
    let vuelto = round2(total_pagos - totales.total);

    // Single transaction: ticket number, aggregate, stock, cash movements
    let mut tx = state.pool.begin().await.map_err(db_err)?;

    let numero_ticket = venta::next_ticket_number(&mut tx).await.map_err(db_err)?;
    let venta_id = Uuid::new_v4();
    let created_at = Utc::now();

    let cabecera = Venta {
        id: venta_id,
        numero_ticket,
        sesion_caja_id: sesion.id,
        usuario_id,
        subtotal: totales.subtotal,
        descuento_total: totales.descuento_total,
        total: totales.total,
        estado: ESTADO_COMPLETADA.to_string(),
        conflicto_stock,
        offline_id: req.offline_id.clone(),
        created_at,
    };
    venta::insert_venta_tx(&mut tx, &cabecera).await.map_err(db_err)?;

    let mut items_resp = Vec::with_capacity(resueltos.len());
    for (orden, r) in resueltos.iter().enumerate() {
        venta::insert_item_tx(
            &mut tx,
            &VentaItem {
                id: Uuid::new_v4(),
                venta_id,
                producto_id: r.producto_id,
                orden: orden as i32,
                cantidad: r.cantidad,
                precio_unitario: r.precio,
                descuento_item: r.descuento,
                subtotal: r.subtotal,
            },
        )
        .await
        .map_err(db_err)?;
        items_resp.push(ItemVentaResponse {
            producto_id: r.producto_id,
            producto: r.nombre.clone(),
            cantidad: r.cantidad,
            precio_unitario: r.precio,
            descuento: r.descuento,
            subtotal: r.subtotal,
        });
    }

    let mut pagos_resp = Vec::with_capacity(req.pagos.len());
    for pago in &req.pagos {
        venta::insert_pago_tx(
            &mut tx,
            &VentaPago {
                id: Uuid::new_v4(),
                venta_id,
                metodo: pago.metodo.as_str().to_string(),
                monto: pago.monto,
            },
        )
        .await
        .map_err(db_err)?;
        pagos_resp.push(PagoResponse {
            metodo: pago.metodo.as_str().to_string(),
            monto: pago.monto,
        });
    }

    // Stock decrements, movements recorded inside the same transaction
    let motivo = format!("Venta #{numero_ticket}");
    let mut conflicto_tx = false;
    for r in &resueltos {
        let c = inventario::descontar_stock_tx(
            &mut tx,
            r.producto_id,
            r.cantidad,
            &motivo,
            Some(venta_id),
        )
        .await
        .map_err(db_err)?;
        conflicto_tx = conflicto_tx || c;
    }
    if conflicto_tx && !conflicto_stock {
        venta::update_conflicto_stock_tx(&mut tx, venta_id)
            .await
            .map_err(db_err)?;
        conflicto_stock = true;
    }

    // One cash movement per payment
    for pago in &req.pagos {
        caja::insert_movimiento_tx(
            &mut tx,
            NuevoMovimiento {
                sesion_caja_id: sesion.id,
                tipo: TipoMovimientoCaja::Venta.as_str().to_string(),
                metodo_pago: Some(pago.metodo.as_str().to_string()),
                monto: pago.monto,
                descripcion: motivo.clone(),
                referencia_id: Some(venta_id),
            },
        )
        .await
        .map_err(db_err)?;
    }

    tx.commit().await.map_err(db_err)?;

    tracing::info!(venta_id = %venta_id, numero_ticket, total = %totales.total, "sale committed");

    // Best-effort: a failed enqueue never rolls back the sale
    let payload = FacturacionJobPayload {
        venta_id: venta_id.to_string(),
        cliente_email: req.cliente_email.clone().filter(|e| !e.is_empty()),
    };
    if let Err(e) = state.dispatcher.enqueue_facturacion(&payload).await {
        tracing::error!(venta_id = %venta_id, error = %e.message, "failed to enqueue facturacion job");
    }

    Ok(VentaResponse {
        id: venta_id,
        numero_ticket,
        sesion_caja_id: sesion.id,
        items: items_resp,
        pagos: pagos_resp,
        subtotal: totales.subtotal,
        descuento_total: totales.descuento_total,
        total: totales.total,
        vuelto,
        estado: ESTADO_COMPLETADA.to_string(),
        conflicto_stock,
        created_at,
    })
}

// ==================== CancelSale ====================

pub async fn anular_venta(state: &AppState, id: Uuid, motivo: &str) -> AppResult<()> {
    let vc = venta::find_by_id(&state.pool, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("venta"))?;

    if vc.venta.is_anulada() {
        return Err(AppError::new(ErrorCode::AlreadyCancelled));
    }

    let descripcion = format!(
        "Anulación venta #{} — {}",
        vc.venta.numero_ticket, motivo
    );

    let mut tx = state.pool.begin().await.map_err(db_err)?;

    for item in &vc.items {
        inventario::restaurar_stock_tx(
            &mut tx,
            item.producto_id,
            item.cantidad,
            &descripcion,
            Some(vc.venta.id),
        )
        .await
        .map_err(db_err)?;
    }

    for pago in &vc.pagos {
        caja::insert_movimiento_tx(
            &mut tx,
            NuevoMovimiento {
                sesion_caja_id: vc.venta.sesion_caja_id,
                tipo: TipoMovimientoCaja::Anulacion.as_str().to_string(),
                metodo_pago: Some(pago.metodo.clone()),
                monto: -pago.monto,
                descripcion: descripcion.clone(),
                referencia_id: Some(vc.venta.id),
            },
        )
        .await
        .map_err(db_err)?;
    }

    venta::update_estado_tx(&mut tx, id, ESTADO_ANULADA)
        .await
        .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;

    tracing::info!(venta_id = %id, "sale cancelled");
    Ok(())
}

// ==================== Offline sync batch ====================

#[derive(Debug, Deserialize)]
pub struct SyncBatchRequest {
    pub ventas: Vec<RegistrarVentaRequest>,
}

#[derive(Debug, Serialize)]
pub struct SyncVentaResultado {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_id: Option<String>,
    /// completada | rechazada | error
    pub estado: String,
    pub conflicto_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venta: Option<VentaResponse>,
}

impl SyncVentaResultado {
    fn rechazada(offline_id: Option<String>) -> Self {
        Self {
            offline_id,
            estado: "rechazada".to_string(),
            conflicto_stock: true,
            venta: None,
        }
    }

    fn error(offline_id: Option<String>) -> Self {
        Self {
            offline_id,
            estado: "error".to_string(),
            conflicto_stock: false,
            venta: None,
        }
    }
}

/// Idempotent ingestion of sales created while disconnected.
///
/// Per request, in order: a line whose deficit exceeds the compensation
/// threshold rejects the sale outright; once the running conflict count
/// reaches the batch budget everything else with a conflict risk is rejected
/// too; otherwise the sale goes through the normal commit path. The batch is
/// not transactional - each sale commits or fails on its own.
pub async fn sync_batch(
    state: &AppState,
    usuario_id: Uuid,
    req: SyncBatchRequest,
) -> AppResult<Vec<SyncVentaResultado>> {
    let presupuesto = max_conflictos(req.ventas.len());
    let mut conflictos = 0usize;
    let mut resultados = Vec::with_capacity(req.ventas.len());

    for venta_req in req.ventas {
        let offline_id = venta_req.offline_id.clone();

        let excede = match deficit_excede_umbral(state, &venta_req).await {
            Ok(excede) => excede,
            Err(e) => {
                tracing::warn!(error = %e.message, "sync batch: stock pre-probe failed");
                resultados.push(SyncVentaResultado::error(offline_id));
                continue;
            }
        };

        if excede {
            conflictos += 1;
            resultados.push(SyncVentaResultado::rechazada(offline_id));
            continue;
        }

        // Budget exhausted: reject even auto-compensable sales
        if conflictos >= presupuesto {
            resultados.push(SyncVentaResultado::rechazada(offline_id));
            continue;
        }

        match registrar_venta(state, usuario_id, venta_req).await {
            Ok(resp) => {
                if resp.conflicto_stock {
                    conflictos += 1;
                }
                resultados.push(SyncVentaResultado {
                    offline_id,
                    estado: resp.estado.clone(),
                    conflicto_stock: resp.conflicto_stock,
                    venta: Some(resp),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e.message, "sync batch: sale failed");
                resultados.push(SyncVentaResultado::error(offline_id));
            }
        }
    }

    Ok(resultados)
}

/// True when any line's deficit is strictly above the compensation threshold
async fn deficit_excede_umbral(
    state: &AppState,
    req: &RegistrarVentaRequest,
) -> AppResult<bool> {
    for item in &req.items {
        let prod = producto::find_by_id(&state.pool, item.producto_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::not_found("producto"))?;
        let deficit = item.cantidad - prod.stock_actual;
        if deficit > COMPENSATION_THRESHOLD {
            return Ok(true);
        }
    }
    Ok(false)
}

// ==================== Listing ====================

#[derive(Debug, Deserialize)]
pub struct ListVentasQuery {
    pub fecha: Option<NaiveDate>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub estado: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub ordenar_por: Option<String>,
    pub orden: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VentaListResponse {
    pub data: Vec<VentaResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

pub async fn listar_ventas(state: &AppState, query: ListVentasQuery) -> AppResult<VentaListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    // "todas" disables the state filter; the default is completed sales
    let estado = match query.estado.as_deref() {
        Some("todas") | Some("all") => None,
        Some(e) => Some(e.to_string()),
        None => Some(ESTADO_COMPLETADA.to_string()),
    };

    let filter = venta::VentaFilter {
        fecha: query.fecha,
        desde: query.desde,
        hasta: query.hasta,
        estado,
        page,
        limit,
        ordenar_por: query.ordenar_por,
        descendente: !matches!(query.orden.as_deref(), Some("asc")),
    };

    let (ventas, total) = venta::list(&state.pool, &filter).await.map_err(db_err)?;

    let mut data = Vec::with_capacity(ventas.len());
    for vc in &ventas {
        data.push(venta_to_response(state, vc).await?);
    }

    Ok(VentaListResponse {
        data,
        total,
        page,
        limit,
    })
}

/// Build the wire response for a stored sale (used by replay and listing)
pub async fn venta_to_response(state: &AppState, vc: &VentaCompleta) -> AppResult<VentaResponse> {
    let mut items = Vec::with_capacity(vc.items.len());
    for item in &vc.items {
        let nombre = producto::find_by_id(&state.pool, item.producto_id)
            .await
            .map_err(db_err)?
            .map(|p| p.nombre)
            .unwrap_or_default();
        items.push(ItemVentaResponse {
            producto_id: item.producto_id,
            producto: nombre,
            cantidad: item.cantidad,
            precio_unitario: item.precio_unitario,
            descuento: item.descuento_item,
            subtotal: item.subtotal,
        });
    }

    let pagos: Vec<PagoResponse> = vc
        .pagos
        .iter()
        .map(|p| PagoResponse {
            metodo: p.metodo.clone(),
            monto: p.monto,
        })
        .collect();
    let total_pagos: Decimal = vc.pagos.iter().map(|p| p.monto).sum();

    Ok(VentaResponse {
        id: vc.venta.id,
        numero_ticket: vc.venta.numero_ticket,
        sesion_caja_id: vc.venta.sesion_caja_id,
        items,
        pagos,
        subtotal: vc.venta.subtotal,
        descuento_total: vc.venta.descuento_total,
        total: vc.venta.total,
        vuelto: round2(total_pagos - vc.venta.total),
        estado: vc.venta.estado.clone(),
        conflicto_stock: vc.venta.conflicto_stock,
        created_at: vc.venta.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(precio: &str, cantidad: i32, descuento: &str) -> ItemResuelto {
        ItemResuelto {
            producto_id: Uuid::new_v4(),
            nombre: "p".into(),
            precio: dec(precio),
            cantidad,
            descuento: dec(descuento),
            subtotal: linea_subtotal(dec(precio), cantidad, dec(descuento)),
        }
    }

    #[test]
    fn test_linea_subtotal() {
        assert_eq!(linea_subtotal(dec("250"), 3, dec("0")), dec("750.00"));
        assert_eq!(linea_subtotal(dec("100"), 2, dec("50")), dec("150.00"));
    }

    #[test]
    fn test_totales_sum_lines_and_discounts() {
        let items = vec![item("250", 3, "0"), item("100", 2, "50")];
        let t = calcular_totales(&items);
        assert_eq!(t.subtotal, dec("900.00"));
        assert_eq!(t.descuento_total, dec("50"));
        // total = subtotal (discounts are already inside line subtotals)
        assert_eq!(t.total, dec("900.00"));
    }

    #[test]
    fn test_max_conflictos_is_ceiling() {
        assert_eq!(max_conflictos(1), 1);
        assert_eq!(max_conflictos(2), 1);
        assert_eq!(max_conflictos(3), 2);
        assert_eq!(max_conflictos(4), 2);
        assert_eq!(max_conflictos(5), 3);
        assert_eq!(max_conflictos(10), 5);
    }

    #[test]
    fn test_validar_request() {
        let base = RegistrarVentaRequest {
            sesion_caja_id: Uuid::new_v4(),
            items: vec![ItemVentaRequest {
                producto_id: Uuid::new_v4(),
                cantidad: 1,
                descuento: Decimal::ZERO,
            }],
            pagos: vec![PagoRequest {
                metodo: MetodoPago::Efectivo,
                monto: dec("10"),
            }],
            offline_id: None,
            cliente_email: None,
        };
        assert!(validar_request(&base).is_ok());

        let mut sin_items = base.clone();
        sin_items.items.clear();
        assert_eq!(
            validar_request(&sin_items).unwrap_err().code,
            ErrorCode::ValidationFailed
        );

        let mut cantidad_cero = base.clone();
        cantidad_cero.items[0].cantidad = 0;
        assert!(validar_request(&cantidad_cero).is_err());

        let mut pago_negativo = base.clone();
        pago_negativo.pagos[0].monto = dec("-1");
        assert!(validar_request(&pago_negativo).is_err());
    }
}
