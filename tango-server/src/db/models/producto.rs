//! Product catalog rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Product - both simple products and parent/child participants.
/// `es_padre` means child units are linked through [`ProductoHijo`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Producto {
    pub id: Uuid,
    pub codigo_barras: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria: String,
    pub precio_costo: Decimal,
    pub precio_venta: Decimal,
    /// Derived: (precio_venta − precio_costo) / precio_costo × 100
    pub margen_pct: Decimal,
    /// May briefly go negative after offline compensation
    pub stock_actual: i32,
    pub stock_minimo: i32,
    pub es_padre: bool,
    pub proveedor_id: Option<Uuid>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directed parent → child edge with the disassembly rule.
/// Invariants: `padre ≠ hijo`, the pair is unique, the edge set is acyclic.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductoHijo {
    pub id: Uuid,
    pub producto_padre_id: Uuid,
    pub producto_hijo_id: Uuid,
    pub unidades_por_padre: i32,
    pub desarme_auto: bool,
    pub created_at: DateTime<Utc>,
}
