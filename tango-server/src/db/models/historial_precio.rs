//! Price-history rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Append-only record of one price change. Never mutated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistorialPrecio {
    pub id: Uuid,
    pub producto_id: Uuid,
    pub proveedor_id: Option<Uuid>,
    pub precio_costo_anterior: Decimal,
    pub precio_costo_nuevo: Decimal,
    pub precio_venta_anterior: Decimal,
    pub precio_venta_nuevo: Decimal,
    pub porcentaje_aplicado: Decimal,
    pub motivo: String,
    pub created_at: DateTime<Utc>,
}
