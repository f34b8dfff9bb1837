//! Cash-session and cash-movement rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ESTADO_ABIERTA: &str = "abierta";
pub const ESTADO_CERRADA: &str = "cerrada";

/// One cashier shift at one register.
/// Invariant: at most one `abierta` session per `punto_de_venta`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SesionCaja {
    pub id: Uuid,
    pub punto_de_venta: i32,
    pub usuario_id: Uuid,
    pub monto_inicial: Decimal,
    /// Set atomically on close
    pub monto_esperado: Option<Decimal>,
    pub monto_declarado: Option<Decimal>,
    pub declarado_efectivo: Option<Decimal>,
    pub declarado_debito: Option<Decimal>,
    pub declarado_credito: Option<Decimal>,
    pub declarado_transferencia: Option<Decimal>,
    pub declarado_qr: Option<Decimal>,
    pub desvio: Option<Decimal>,
    pub desvio_pct: Option<Decimal>,
    /// abierta | cerrada
    pub estado: String,
    /// normal | advertencia | critico
    pub clasificacion_desvio: Option<String>,
    pub observaciones: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl SesionCaja {
    pub fn is_abierta(&self) -> bool {
        self.estado == ESTADO_ABIERTA
    }
}

/// Immutable entry in the cash ledger. Never updated or deleted;
/// cancellations insert inverse entries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovimientoCaja {
    pub id: Uuid,
    pub sesion_caja_id: Uuid,
    /// venta | ingreso_manual | egreso_manual | anulacion
    pub tipo: String,
    /// Null for non-monetary entries
    pub metodo_pago: Option<String>,
    /// Negative for egress and cancellations
    pub monto: Decimal,
    pub descripcion: String,
    /// Back-reference to the originating sale, when any
    pub referencia_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Movement type in the cash ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoMovimientoCaja {
    Venta,
    IngresoManual,
    EgresoManual,
    Anulacion,
}

impl TipoMovimientoCaja {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoMovimientoCaja::Venta => "venta",
            TipoMovimientoCaja::IngresoManual => "ingreso_manual",
            TipoMovimientoCaja::EgresoManual => "egreso_manual",
            TipoMovimientoCaja::Anulacion => "anulacion",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "venta" => Some(TipoMovimientoCaja::Venta),
            "ingreso_manual" => Some(TipoMovimientoCaja::IngresoManual),
            "egreso_manual" => Some(TipoMovimientoCaja::EgresoManual),
            "anulacion" => Some(TipoMovimientoCaja::Anulacion),
            _ => None,
        }
    }
}

/// Deviation classification produced by the blind arqueo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClasificacionDesvio {
    Normal,
    Advertencia,
    Critico,
}

impl ClasificacionDesvio {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClasificacionDesvio::Normal => "normal",
            ClasificacionDesvio::Advertencia => "advertencia",
            ClasificacionDesvio::Critico => "critico",
        }
    }
}
