//! Price-history repository - append-only

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::HistorialPrecio;

const HISTORIAL_COLS: &str = "id, producto_id, proveedor_id, precio_costo_anterior, \
     precio_costo_nuevo, precio_venta_anterior, precio_venta_nuevo, porcentaje_aplicado, \
     motivo, created_at";

pub struct NuevoHistorial {
    pub producto_id: Uuid,
    pub proveedor_id: Option<Uuid>,
    pub precio_costo_anterior: Decimal,
    pub precio_costo_nuevo: Decimal,
    pub precio_venta_anterior: Decimal,
    pub precio_venta_nuevo: Decimal,
    pub porcentaje_aplicado: Decimal,
    pub motivo: String,
}

pub async fn insert(pool: &PgPool, data: NuevoHistorial) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO historial_precios
            (id, producto_id, proveedor_id, precio_costo_anterior, precio_costo_nuevo,
             precio_venta_anterior, precio_venta_nuevo, porcentaje_aplicado, motivo, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(data.producto_id)
    .bind(data.proveedor_id)
    .bind(data.precio_costo_anterior)
    .bind(data.precio_costo_nuevo)
    .bind(data.precio_venta_anterior)
    .bind(data.precio_venta_nuevo)
    .bind(data.porcentaje_aplicado)
    .bind(&data.motivo)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_by_producto(
    pool: &PgPool,
    producto_id: Uuid,
    page: i64,
    limit: i64,
) -> Result<(Vec<HistorialPrecio>, i64), sqlx::Error> {
    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM historial_precios WHERE producto_id = $1")
            .bind(producto_id)
            .fetch_one(pool)
            .await?;
    let rows = sqlx::query_as::<_, HistorialPrecio>(&format!(
        "SELECT {HISTORIAL_COLS} FROM historial_precios \
         WHERE producto_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    ))
    .bind(producto_id)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(pool)
    .await?;
    Ok((rows, total))
}
