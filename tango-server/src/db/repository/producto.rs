//! Product repository
//!
//! Stock mutations always go through `update_stock_tx` so the row update and
//! its movement record share one transaction.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::models::{Producto, ProductoHijo};

const PRODUCTO_COLS: &str = "id, codigo_barras, nombre, descripcion, categoria, precio_costo, \
     precio_venta, margen_pct, stock_actual, stock_minimo, es_padre, proveedor_id, activo, \
     created_at, updated_at";

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Producto>, sqlx::Error> {
    sqlx::query_as::<_, Producto>(&format!(
        "SELECT {PRODUCTO_COLS} FROM productos WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Same lookup but inside an open transaction, so the caller observes stock
/// values that are consistent with its own pending updates.
pub async fn find_by_id_tx(
    tx: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Producto>, sqlx::Error> {
    sqlx::query_as::<_, Producto>(&format!(
        "SELECT {PRODUCTO_COLS} FROM productos WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(tx)
    .await
}

pub async fn find_by_barcode(
    pool: &PgPool,
    codigo_barras: &str,
) -> Result<Option<Producto>, sqlx::Error> {
    sqlx::query_as::<_, Producto>(&format!(
        "SELECT {PRODUCTO_COLS} FROM productos WHERE codigo_barras = $1"
    ))
    .bind(codigo_barras)
    .fetch_optional(pool)
    .await
}

pub struct NuevoProducto {
    pub codigo_barras: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria: String,
    pub precio_costo: Decimal,
    pub precio_venta: Decimal,
    pub margen_pct: Decimal,
    pub stock_actual: i32,
    pub stock_minimo: i32,
    pub es_padre: bool,
    pub proveedor_id: Option<Uuid>,
}

pub async fn create(pool: &PgPool, data: NuevoProducto) -> Result<Producto, sqlx::Error> {
    sqlx::query_as::<_, Producto>(&format!(
        r#"
        INSERT INTO productos
            (id, codigo_barras, nombre, descripcion, categoria, precio_costo, precio_venta,
             margen_pct, stock_actual, stock_minimo, es_padre, proveedor_id, activo,
             created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, TRUE, now(), now())
        RETURNING {PRODUCTO_COLS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&data.codigo_barras)
    .bind(&data.nombre)
    .bind(&data.descripcion)
    .bind(&data.categoria)
    .bind(data.precio_costo)
    .bind(data.precio_venta)
    .bind(data.margen_pct)
    .bind(data.stock_actual)
    .bind(data.stock_minimo)
    .bind(data.es_padre)
    .bind(data.proveedor_id)
    .fetch_one(pool)
    .await
}

pub struct ProductoUpdate {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria: String,
    pub precio_costo: Decimal,
    pub precio_venta: Decimal,
    pub margen_pct: Decimal,
    pub stock_minimo: i32,
    pub proveedor_id: Option<Uuid>,
    pub activo: bool,
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    data: ProductoUpdate,
) -> Result<Option<Producto>, sqlx::Error> {
    sqlx::query_as::<_, Producto>(&format!(
        r#"
        UPDATE productos SET
            nombre = $2, descripcion = $3, categoria = $4, precio_costo = $5,
            precio_venta = $6, margen_pct = $7, stock_minimo = $8, proveedor_id = $9,
            activo = $10, updated_at = now()
        WHERE id = $1
        RETURNING {PRODUCTO_COLS}
        "#
    ))
    .bind(id)
    .bind(&data.nombre)
    .bind(&data.descripcion)
    .bind(&data.categoria)
    .bind(data.precio_costo)
    .bind(data.precio_venta)
    .bind(data.margen_pct)
    .bind(data.stock_minimo)
    .bind(data.proveedor_id)
    .bind(data.activo)
    .fetch_optional(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    page: i64,
    limit: i64,
    buscar: Option<&str>,
) -> Result<(Vec<Producto>, i64), sqlx::Error> {
    let offset = (page - 1) * limit;
    let pattern = buscar.map(|s| format!("%{s}%"));

    let (total, rows) = match &pattern {
        Some(p) => {
            let total: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM productos WHERE nombre ILIKE $1 OR codigo_barras ILIKE $1",
            )
            .bind(p)
            .fetch_one(pool)
            .await?;
            let rows = sqlx::query_as::<_, Producto>(&format!(
                "SELECT {PRODUCTO_COLS} FROM productos \
                 WHERE nombre ILIKE $1 OR codigo_barras ILIKE $1 \
                 ORDER BY nombre LIMIT $2 OFFSET $3"
            ))
            .bind(p)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
            (total, rows)
        }
        None => {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM productos")
                .fetch_one(pool)
                .await?;
            let rows = sqlx::query_as::<_, Producto>(&format!(
                "SELECT {PRODUCTO_COLS} FROM productos ORDER BY nombre LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
            (total, rows)
        }
    };

    Ok((rows, total))
}

/// Apply a signed stock delta. The UPDATE takes the row lock, serializing
/// concurrent mutations of the same product.
pub async fn update_stock_tx(
    tx: &mut PgConnection,
    id: Uuid,
    delta: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE productos SET stock_actual = stock_actual + $1, updated_at = now() WHERE id = $2")
        .bind(delta)
        .bind(id)
        .execute(tx)
        .await?;
    Ok(())
}

pub async fn low_stock(pool: &PgPool) -> Result<Vec<Producto>, sqlx::Error> {
    sqlx::query_as::<_, Producto>(&format!(
        "SELECT {PRODUCTO_COLS} FROM productos \
         WHERE activo AND stock_actual <= stock_minimo ORDER BY stock_actual"
    ))
    .fetch_all(pool)
    .await
}

// ==================== Parent-child links ====================

const VINCULO_COLS: &str =
    "id, producto_padre_id, producto_hijo_id, unidades_por_padre, desarme_auto, created_at";

pub async fn create_vinculo(
    pool: &PgPool,
    padre_id: Uuid,
    hijo_id: Uuid,
    unidades_por_padre: i32,
    desarme_auto: bool,
) -> Result<ProductoHijo, sqlx::Error> {
    sqlx::query_as::<_, ProductoHijo>(&format!(
        r#"
        INSERT INTO producto_hijos
            (id, producto_padre_id, producto_hijo_id, unidades_por_padre, desarme_auto, created_at)
        VALUES ($1, $2, $3, $4, $5, now())
        RETURNING {VINCULO_COLS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(padre_id)
    .bind(hijo_id)
    .bind(unidades_por_padre)
    .bind(desarme_auto)
    .fetch_one(pool)
    .await
}

pub async fn find_vinculo_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<ProductoHijo>, sqlx::Error> {
    sqlx::query_as::<_, ProductoHijo>(&format!(
        "SELECT {VINCULO_COLS} FROM producto_hijos WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Auto-disassembly edge for a child product, when one is declared
pub async fn find_vinculo_auto_by_hijo(
    tx: &mut PgConnection,
    hijo_id: Uuid,
) -> Result<Option<ProductoHijo>, sqlx::Error> {
    sqlx::query_as::<_, ProductoHijo>(&format!(
        "SELECT {VINCULO_COLS} FROM producto_hijos \
         WHERE producto_hijo_id = $1 AND desarme_auto LIMIT 1"
    ))
    .bind(hijo_id)
    .fetch_optional(tx)
    .await
}

pub async fn find_vinculo_by_par(
    pool: &PgPool,
    padre_id: Uuid,
    hijo_id: Uuid,
) -> Result<Option<ProductoHijo>, sqlx::Error> {
    sqlx::query_as::<_, ProductoHijo>(&format!(
        "SELECT {VINCULO_COLS} FROM producto_hijos \
         WHERE producto_padre_id = $1 AND producto_hijo_id = $2"
    ))
    .bind(padre_id)
    .bind(hijo_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_vinculos(pool: &PgPool) -> Result<Vec<ProductoHijo>, sqlx::Error> {
    sqlx::query_as::<_, ProductoHijo>(&format!(
        "SELECT {VINCULO_COLS} FROM producto_hijos ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await
}

/// All edges as (padre, hijo) pairs - used by the cycle check on link creation
pub async fn list_vinculo_edges(pool: &PgPool) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT producto_padre_id, producto_hijo_id FROM producto_hijos",
    )
    .fetch_all(pool)
    .await
}
