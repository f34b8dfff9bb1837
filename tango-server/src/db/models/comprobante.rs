//! Fiscal receipt rows

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ESTADO_PENDIENTE: &str = "pendiente";
pub const ESTADO_EMITIDO: &str = "emitido";
pub const ESTADO_RECHAZADO: &str = "rechazado";
pub const ESTADO_ERROR: &str = "error";
pub const ESTADO_ANULADO: &str = "anulado";

/// One fiscal or internal receipt per completed sale.
///
/// State machine: `pendiente` → (`emitido` | `rechazado` | `error` |
/// `anulado`). An `emitido` receipt always carries a CAE and its expiry.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comprobante {
    pub id: Uuid,
    pub venta_id: Uuid,
    /// ticket_interno | factura_a | factura_b | factura_c | nota_credito | nota_debito
    pub tipo: String,
    pub numero: Option<i64>,
    pub punto_de_venta: i32,
    /// Authorization code returned by the fiscal authority
    pub cae: Option<String>,
    pub cae_vencimiento: Option<NaiveDate>,
    pub receptor_cuit: Option<String>,
    pub receptor_nombre: Option<String>,
    pub monto_neto: Decimal,
    pub monto_iva: Decimal,
    pub monto_total: Decimal,
    pub estado: String,
    /// Absolute path of the generated ticket document
    pub pdf_path: Option<String>,
    pub observaciones: Option<String>,
    pub retry_count: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Receipt type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoComprobante {
    TicketInterno,
    FacturaA,
    FacturaB,
    FacturaC,
    NotaCredito,
    NotaDebito,
}

impl TipoComprobante {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoComprobante::TicketInterno => "ticket_interno",
            TipoComprobante::FacturaA => "factura_a",
            TipoComprobante::FacturaB => "factura_b",
            TipoComprobante::FacturaC => "factura_c",
            TipoComprobante::NotaCredito => "nota_credito",
            TipoComprobante::NotaDebito => "nota_debito",
        }
    }

    /// Numeric code the authority expects for this type
    pub fn codigo_afip(&self) -> i32 {
        match self {
            TipoComprobante::FacturaA => 1,
            TipoComprobante::FacturaB => 6,
            TipoComprobante::NotaCredito => 8,
            TipoComprobante::NotaDebito => 7,
            // Internal tickets are reported as Factura C (consumidor final)
            TipoComprobante::TicketInterno | TipoComprobante::FacturaC => 11,
        }
    }
}
