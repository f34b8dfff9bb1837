//! Sale aggregate rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub const ESTADO_COMPLETADA: &str = "completada";
pub const ESTADO_ANULADA: &str = "anulada";

/// Sale header. Owns a non-empty ordered list of items and a non-empty list
/// of payments; `numero_ticket` comes from the transactional global counter.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Venta {
    pub id: Uuid,
    pub numero_ticket: i64,
    pub sesion_caja_id: Uuid,
    pub usuario_id: Uuid,
    pub subtotal: Decimal,
    pub descuento_total: Decimal,
    pub total: Decimal,
    /// completada | anulada
    pub estado: String,
    /// Set when any line needed stock compensation
    pub conflicto_stock: bool,
    /// Offline-client idempotency key, unique when present
    pub offline_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Venta {
    pub fn is_anulada(&self) -> bool {
        self.estado == ESTADO_ANULADA
    }
}

/// Sale line. `precio_unitario` is captured at sale time; later price changes
/// never alter history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VentaItem {
    pub id: Uuid,
    pub venta_id: Uuid,
    pub producto_id: Uuid,
    /// Position within the sale - items are an ordered list
    pub orden: i32,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub descuento_item: Decimal,
    pub subtotal: Decimal,
}

/// Sale payment split
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VentaPago {
    pub id: Uuid,
    pub venta_id: Uuid,
    /// efectivo | debito | credito | transferencia | qr
    pub metodo: String,
    pub monto: Decimal,
}

/// A sale loaded with its items and payments
#[derive(Debug, Clone)]
pub struct VentaCompleta {
    pub venta: Venta,
    pub items: Vec<VentaItem>,
    pub pagos: Vec<VentaPago>,
}
