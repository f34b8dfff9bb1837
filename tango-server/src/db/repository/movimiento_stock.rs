//! Stock-movement repository - append-only, written inside the owning
//! transaction so the pre/post values are consistent with the stock update.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::models::MovimientoStock;

const MOVIMIENTO_COLS: &str = "id, producto_id, tipo, cantidad, stock_anterior, stock_nuevo, \
     motivo, referencia_id, created_at";

pub struct NuevoMovimientoStock {
    pub producto_id: Uuid,
    pub tipo: String,
    pub cantidad: i32,
    pub stock_anterior: i32,
    pub stock_nuevo: i32,
    pub motivo: String,
    pub referencia_id: Option<Uuid>,
}

pub async fn insert_tx(
    tx: &mut PgConnection,
    mov: NuevoMovimientoStock,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO movimientos_stock
            (id, producto_id, tipo, cantidad, stock_anterior, stock_nuevo, motivo,
             referencia_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(mov.producto_id)
    .bind(&mov.tipo)
    .bind(mov.cantidad)
    .bind(mov.stock_anterior)
    .bind(mov.stock_nuevo)
    .bind(&mov.motivo)
    .bind(mov.referencia_id)
    .execute(tx)
    .await?;
    Ok(())
}

pub async fn list_by_producto(
    pool: &PgPool,
    producto_id: Uuid,
    limit: i64,
) -> Result<Vec<MovimientoStock>, sqlx::Error> {
    sqlx::query_as::<_, MovimientoStock>(&format!(
        "SELECT {MOVIMIENTO_COLS} FROM movimientos_stock \
         WHERE producto_id = $1 ORDER BY created_at DESC LIMIT $2"
    ))
    .bind(producto_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
