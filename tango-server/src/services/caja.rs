//! Cash-session service - open/close discipline and blind reconciliation
//!
//! The expected totals are always recomputed from the immutable movement
//! ledger; nothing is denormalized before close. The cashier declares their
//! count blind and only then does the service compute the deviation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::money::{pct_of, round2};
use shared::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use crate::db::db_err;
use crate::db::models::{ClasificacionDesvio, MetodoPago, SesionCaja, TipoMovimientoCaja};
use crate::db::repository::caja::{self, CierreSesion, NuevoMovimiento};
use crate::db::repository::venta;
use crate::state::AppState;

/// Amounts broken down by payment method
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MontosPorMetodo {
    #[serde(default)]
    pub efectivo: Decimal,
    #[serde(default)]
    pub debito: Decimal,
    #[serde(default)]
    pub credito: Decimal,
    #[serde(default)]
    pub transferencia: Decimal,
    #[serde(default)]
    pub qr: Decimal,
    #[serde(default)]
    pub total: Decimal,
}

impl MontosPorMetodo {
    /// Expected totals: the opening amount only feeds the cash column
    pub fn esperado(monto_inicial: Decimal, sums: &HashMap<String, Decimal>) -> Self {
        let get = |m: MetodoPago| sums.get(m.as_str()).copied().unwrap_or(Decimal::ZERO);
        let mut montos = Self {
            efectivo: monto_inicial + get(MetodoPago::Efectivo),
            debito: get(MetodoPago::Debito),
            credito: get(MetodoPago::Credito),
            transferencia: get(MetodoPago::Transferencia),
            qr: get(MetodoPago::Qr),
            total: Decimal::ZERO,
        };
        montos.total = montos.suma();
        montos
    }

    pub fn con_total(mut self) -> Self {
        self.total = self.suma();
        self
    }

    fn suma(&self) -> Decimal {
        self.efectivo + self.debito + self.credito + self.transferencia + self.qr
    }
}

/// Deviation classification thresholds on |deviation %|:
/// ≤ 1 normal, ≤ 5 advertencia, > 5 critico
pub fn clasificar_desvio(pct: Decimal) -> ClasificacionDesvio {
    let abs = pct.abs();
    if abs <= Decimal::ONE {
        ClasificacionDesvio::Normal
    } else if abs <= Decimal::from(5) {
        ClasificacionDesvio::Advertencia
    } else {
        ClasificacionDesvio::Critico
    }
}

#[derive(Debug, Clone)]
pub struct ArqueoCalculo {
    pub esperado: MontosPorMetodo,
    pub declarado: MontosPorMetodo,
    pub desvio: Decimal,
    pub desvio_pct: Decimal,
    pub clasificacion: ClasificacionDesvio,
}

/// Pure arqueo math over the ledger sums and the blind declaration
pub fn calcular_arqueo(
    monto_inicial: Decimal,
    sums: &HashMap<String, Decimal>,
    declaracion: MontosPorMetodo,
) -> ArqueoCalculo {
    let esperado = MontosPorMetodo::esperado(monto_inicial, sums);
    let declarado = declaracion.con_total();

    let desvio = round2(declarado.total - esperado.total);
    let desvio_pct = pct_of(desvio, esperado.total);

    ArqueoCalculo {
        clasificacion: clasificar_desvio(desvio_pct),
        esperado,
        declarado,
        desvio,
        desvio_pct,
    }
}

// ==================== DTOs ====================

#[derive(Debug, Deserialize)]
pub struct AbrirCajaRequest {
    pub punto_de_venta: i32,
    pub monto_inicial: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct MovimientoManualRequest {
    pub sesion_caja_id: Uuid,
    /// ingreso_manual | egreso_manual
    pub tipo: TipoMovimientoCaja,
    pub metodo_pago: MetodoPago,
    pub monto: Decimal,
    pub descripcion: String,
}

#[derive(Debug, Deserialize)]
pub struct ArqueoRequest {
    /// Defaults to the caller's open session when absent
    pub sesion_caja_id: Option<Uuid>,
    pub declaracion: MontosPorMetodo,
    pub observaciones: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DesvioResponse {
    pub monto: Decimal,
    pub porcentaje: Decimal,
    pub clasificacion: ClasificacionDesvio,
}

#[derive(Debug, Serialize)]
pub struct ArqueoResponse {
    pub sesion_caja_id: Uuid,
    pub monto_esperado: MontosPorMetodo,
    pub monto_declarado: MontosPorMetodo,
    pub desvio: DesvioResponse,
    pub estado: String,
}

#[derive(Debug, Serialize)]
pub struct ReporteCajaResponse {
    pub sesion_caja_id: Uuid,
    pub punto_de_venta: i32,
    pub usuario_id: Uuid,
    pub estado: String,
    pub monto_inicial: Decimal,
    pub esperado: MontosPorMetodo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declarado: Option<MontosPorMetodo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desvio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desvio_pct: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clasificacion_desvio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
    pub ventas_completadas: i64,
    pub opened_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

// ==================== Operations ====================

/// Open a session. At most one open session per register.
pub async fn abrir(
    state: &AppState,
    usuario_id: Uuid,
    req: AbrirCajaRequest,
) -> AppResult<ReporteCajaResponse> {
    if req.monto_inicial < Decimal::ZERO {
        return Err(AppError::validation("monto_inicial no puede ser negativo")
            .with_field("monto_inicial", "min"));
    }

    if caja::find_abierta_por_pdv(&state.pool, req.punto_de_venta)
        .await
        .map_err(db_err)?
        .is_some()
    {
        return Err(AppError::new(ErrorCode::DuplicateOpen));
    }

    let sesion = caja::create_sesion(&state.pool, req.punto_de_venta, usuario_id, req.monto_inicial)
        .await
        .map_err(db_err)?;

    tracing::info!(sesion_id = %sesion.id, punto_de_venta = req.punto_de_venta, "cash session opened");
    build_reporte(state, sesion).await
}

/// Append a manual movement to an open session. Manual egress is stored
/// negative; the ledger itself is append-only.
pub async fn registrar_movimiento(state: &AppState, req: MovimientoManualRequest) -> AppResult<()> {
    let tipo = match req.tipo {
        TipoMovimientoCaja::IngresoManual | TipoMovimientoCaja::EgresoManual => req.tipo,
        _ => {
            return Err(AppError::validation(
                "tipo debe ser ingreso_manual o egreso_manual",
            )
            .with_field("tipo", "oneof"))
        }
    };
    if req.monto <= Decimal::ZERO {
        return Err(AppError::validation("monto debe ser positivo").with_field("monto", "min"));
    }

    let sesion = find_sesion(state, req.sesion_caja_id).await?;
    if !sesion.is_abierta() {
        return Err(AppError::new(ErrorCode::ClosedSession));
    }

    let monto = match tipo {
        TipoMovimientoCaja::EgresoManual => -req.monto,
        _ => req.monto,
    };

    caja::insert_movimiento(
        &state.pool,
        NuevoMovimiento {
            sesion_caja_id: sesion.id,
            tipo: tipo.as_str().to_string(),
            metodo_pago: Some(req.metodo_pago.as_str().to_string()),
            monto,
            descripcion: req.descripcion,
            referencia_id: None,
        },
    )
    .await
    .map_err(db_err)?;

    Ok(())
}

/// Blind arqueo: compute expected totals from the ledger, classify the
/// deviation against the declaration, and close the session atomically.
///
/// A `critico` classification without non-empty observations is refused.
pub async fn arqueo(
    state: &AppState,
    usuario_id: Uuid,
    req: ArqueoRequest,
) -> AppResult<ArqueoResponse> {
    let sesion = match req.sesion_caja_id {
        Some(id) => find_sesion(state, id).await?,
        None => caja::find_abierta_por_usuario(&state.pool, usuario_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| AppError::new(ErrorCode::ClosedSession))?,
    };

    if !sesion.is_abierta() {
        return Err(AppError::with_message(
            ErrorCode::ClosedSession,
            "la sesión ya está cerrada",
        ));
    }

    let sums = caja::sum_movimientos_por_metodo(&state.pool, sesion.id)
        .await
        .map_err(db_err)?;
    let calculo = calcular_arqueo(sesion.monto_inicial, &sums, req.declaracion);

    let observaciones_vacias = req
        .observaciones
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true);
    if calculo.clasificacion == ClasificacionDesvio::Critico && observaciones_vacias {
        return Err(AppError::new(ErrorCode::ObservationsRequired));
    }

    let cerrada = caja::cerrar_sesion(
        &state.pool,
        sesion.id,
        CierreSesion {
            monto_esperado: calculo.esperado.total,
            monto_declarado: calculo.declarado.total,
            declarado_efectivo: calculo.declarado.efectivo,
            declarado_debito: calculo.declarado.debito,
            declarado_credito: calculo.declarado.credito,
            declarado_transferencia: calculo.declarado.transferencia,
            declarado_qr: calculo.declarado.qr,
            desvio: calculo.desvio,
            desvio_pct: calculo.desvio_pct,
            clasificacion: calculo.clasificacion.as_str().to_string(),
            observaciones: req.observaciones,
            closed_at: Utc::now(),
        },
    )
    .await
    .map_err(db_err)?;

    if !cerrada {
        // Lost the race against a concurrent close
        return Err(AppError::with_message(
            ErrorCode::ClosedSession,
            "la sesión ya está cerrada",
        ));
    }

    tracing::info!(
        sesion_id = %sesion.id,
        desvio = %calculo.desvio,
        clasificacion = calculo.clasificacion.as_str(),
        "cash session closed"
    );

    Ok(ArqueoResponse {
        sesion_caja_id: sesion.id,
        monto_esperado: calculo.esperado,
        monto_declarado: calculo.declarado,
        desvio: DesvioResponse {
            monto: calculo.desvio,
            porcentaje: calculo.desvio_pct,
            clasificacion: calculo.clasificacion,
        },
        estado: "cerrada".to_string(),
    })
}

/// Session report, expected totals recomputed from the ledger
pub async fn reporte(state: &AppState, sesion_id: Uuid) -> AppResult<ReporteCajaResponse> {
    let sesion = find_sesion(state, sesion_id).await?;
    build_reporte(state, sesion).await
}

/// The single open session owned by the user, when any
pub async fn activa(
    state: &AppState,
    usuario_id: Uuid,
) -> AppResult<Option<ReporteCajaResponse>> {
    let Some(sesion) = caja::find_abierta_por_usuario(&state.pool, usuario_id)
        .await
        .map_err(db_err)?
    else {
        return Ok(None);
    };
    build_reporte(state, sesion).await.map(Some)
}

/// Paginated session history, newest first
pub async fn historial(
    state: &AppState,
    page: i64,
    limit: i64,
) -> AppResult<Vec<ReporteCajaResponse>> {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);
    let (sesiones, _) = caja::list_sesiones(&state.pool, page, limit)
        .await
        .map_err(db_err)?;

    let mut reportes = Vec::with_capacity(sesiones.len());
    for sesion in sesiones {
        reportes.push(build_reporte(state, sesion).await?);
    }
    Ok(reportes)
}

async fn find_sesion(state: &AppState, id: Uuid) -> AppResult<SesionCaja> {
    caja::find_sesion_by_id(&state.pool, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("sesión de caja"))
}

async fn build_reporte(state: &AppState, sesion: SesionCaja) -> AppResult<ReporteCajaResponse> {
    let sums = caja::sum_movimientos_por_metodo(&state.pool, sesion.id)
        .await
        .map_err(db_err)?;
    let esperado = MontosPorMetodo::esperado(sesion.monto_inicial, &sums);

    let declarado = sesion.monto_declarado.map(|total| MontosPorMetodo {
        efectivo: sesion.declarado_efectivo.unwrap_or_default(),
        debito: sesion.declarado_debito.unwrap_or_default(),
        credito: sesion.declarado_credito.unwrap_or_default(),
        transferencia: sesion.declarado_transferencia.unwrap_or_default(),
        qr: sesion.declarado_qr.unwrap_or_default(),
        total,
    });

    let ventas_completadas = venta::count_completadas_by_sesion(&state.pool, sesion.id)
        .await
        .map_err(db_err)?;

    Ok(ReporteCajaResponse {
        sesion_caja_id: sesion.id,
        punto_de_venta: sesion.punto_de_venta,
        usuario_id: sesion.usuario_id,
        estado: sesion.estado,
        monto_inicial: sesion.monto_inicial,
        esperado,
        declarado,
        desvio: sesion.desvio,
        desvio_pct: sesion.desvio_pct,
        clasificacion_desvio: sesion.clasificacion_desvio,
        observaciones: sesion.observaciones,
        ventas_completadas,
        opened_at: sesion.opened_at,
        closed_at: sesion.closed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_clasificacion_boundaries() {
        assert_eq!(clasificar_desvio(dec("1.00")), ClasificacionDesvio::Normal);
        assert_eq!(clasificar_desvio(dec("-1.00")), ClasificacionDesvio::Normal);
        assert_eq!(
            clasificar_desvio(dec("1.01")),
            ClasificacionDesvio::Advertencia
        );
        assert_eq!(
            clasificar_desvio(dec("5.00")),
            ClasificacionDesvio::Advertencia
        );
        assert_eq!(clasificar_desvio(dec("5.01")), ClasificacionDesvio::Critico);
        assert_eq!(
            clasificar_desvio(dec("-10.00")),
            ClasificacionDesvio::Critico
        );
    }

    #[test]
    fn test_esperado_opening_only_feeds_cash() {
        let mut sums = HashMap::new();
        sums.insert("efectivo".to_string(), dec("750"));
        sums.insert("debito".to_string(), dec("200"));

        let esperado = MontosPorMetodo::esperado(dec("1000"), &sums);
        assert_eq!(esperado.efectivo, dec("1750"));
        assert_eq!(esperado.debito, dec("200"));
        assert_eq!(esperado.credito, Decimal::ZERO);
        assert_eq!(esperado.total, dec("1950"));
    }

    #[test]
    fn test_calcular_arqueo_critical_deviation() {
        // Opening 10000, no movements, declared 9000 → −10%
        let sums = HashMap::new();
        let declaracion = MontosPorMetodo {
            efectivo: dec("9000"),
            ..Default::default()
        };

        let calculo = calcular_arqueo(dec("10000"), &sums, declaracion);
        assert_eq!(calculo.esperado.total, dec("10000"));
        assert_eq!(calculo.declarado.total, dec("9000"));
        assert_eq!(calculo.desvio, dec("-1000.00"));
        assert_eq!(calculo.desvio_pct, dec("-10.00"));
        assert_eq!(calculo.clasificacion, ClasificacionDesvio::Critico);
    }

    #[test]
    fn test_calcular_arqueo_zero_expected() {
        let sums = HashMap::new();
        let declaracion = MontosPorMetodo {
            efectivo: dec("50"),
            ..Default::default()
        };
        let calculo = calcular_arqueo(Decimal::ZERO, &sums, declaracion);
        assert_eq!(calculo.desvio, dec("50.00"));
        // Deviation % is zero when the expected total is zero
        assert_eq!(calculo.desvio_pct, Decimal::ZERO);
        assert_eq!(calculo.clasificacion, ClasificacionDesvio::Normal);
    }

    #[test]
    fn test_calcular_arqueo_exact_match() {
        let mut sums = HashMap::new();
        sums.insert("efectivo".to_string(), dec("750"));
        let declaracion = MontosPorMetodo {
            efectivo: dec("1750"),
            ..Default::default()
        };
        let calculo = calcular_arqueo(dec("1000"), &sums, declaracion);
        assert_eq!(calculo.desvio, dec("0.00"));
        assert_eq!(calculo.clasificacion, ClasificacionDesvio::Normal);
    }
}
