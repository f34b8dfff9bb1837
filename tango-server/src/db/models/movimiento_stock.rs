//! Stock movement ledger rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only record of one stock change.
/// Invariant: `stock_nuevo = stock_anterior + cantidad`, and every stock
/// mutation produces exactly one movement.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovimientoStock {
    pub id: Uuid,
    pub producto_id: Uuid,
    /// venta | ajuste_manual | desarme | restore_anulacion
    pub tipo: String,
    /// Signed delta
    pub cantidad: i32,
    pub stock_anterior: i32,
    pub stock_nuevo: i32,
    pub motivo: String,
    pub referencia_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Movement type in the stock ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoMovimientoStock {
    Venta,
    AjusteManual,
    Desarme,
    RestoreAnulacion,
}

impl TipoMovimientoStock {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoMovimientoStock::Venta => "venta",
            TipoMovimientoStock::AjusteManual => "ajuste_manual",
            TipoMovimientoStock::Desarme => "desarme",
            TipoMovimientoStock::RestoreAnulacion => "restore_anulacion",
        }
    }
}
