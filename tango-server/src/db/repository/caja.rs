//! Cash-session repository
//!
//! Movements are append-only: there is no UPDATE or DELETE on
//! `movimientos_caja` anywhere in this module. The session row is only
//! updated once, by the close.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::models::{MovimientoCaja, SesionCaja, ESTADO_ABIERTA};

const SESION_COLS: &str = "id, punto_de_venta, usuario_id, monto_inicial, monto_esperado, \
     monto_declarado, declarado_efectivo, declarado_debito, declarado_credito, \
     declarado_transferencia, declarado_qr, desvio, desvio_pct, estado, \
     clasificacion_desvio, observaciones, opened_at, closed_at";

const MOVIMIENTO_COLS: &str =
    "id, sesion_caja_id, tipo, metodo_pago, monto, descripcion, referencia_id, created_at";

pub async fn create_sesion(
    pool: &PgPool,
    punto_de_venta: i32,
    usuario_id: Uuid,
    monto_inicial: Decimal,
) -> Result<SesionCaja, sqlx::Error> {
    sqlx::query_as::<_, SesionCaja>(&format!(
        r#"
        INSERT INTO sesiones_caja (id, punto_de_venta, usuario_id, monto_inicial, estado, opened_at)
        VALUES ($1, $2, $3, $4, 'abierta', now())
        RETURNING {SESION_COLS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(punto_de_venta)
    .bind(usuario_id)
    .bind(monto_inicial)
    .fetch_one(pool)
    .await
}

pub async fn find_sesion_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<SesionCaja>, sqlx::Error> {
    sqlx::query_as::<_, SesionCaja>(&format!(
        "SELECT {SESION_COLS} FROM sesiones_caja WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The open session for a register, if any (at most one exists)
pub async fn find_abierta_por_pdv(
    pool: &PgPool,
    punto_de_venta: i32,
) -> Result<Option<SesionCaja>, sqlx::Error> {
    sqlx::query_as::<_, SesionCaja>(&format!(
        "SELECT {SESION_COLS} FROM sesiones_caja \
         WHERE punto_de_venta = $1 AND estado = $2 LIMIT 1"
    ))
    .bind(punto_de_venta)
    .bind(ESTADO_ABIERTA)
    .fetch_optional(pool)
    .await
}

pub async fn find_abierta_por_usuario(
    pool: &PgPool,
    usuario_id: Uuid,
) -> Result<Option<SesionCaja>, sqlx::Error> {
    sqlx::query_as::<_, SesionCaja>(&format!(
        "SELECT {SESION_COLS} FROM sesiones_caja \
         WHERE usuario_id = $1 AND estado = $2 LIMIT 1"
    ))
    .bind(usuario_id)
    .bind(ESTADO_ABIERTA)
    .fetch_optional(pool)
    .await
}

/// Terminal close fields, persisted atomically
pub struct CierreSesion {
    pub monto_esperado: Decimal,
    pub monto_declarado: Decimal,
    pub declarado_efectivo: Decimal,
    pub declarado_debito: Decimal,
    pub declarado_credito: Decimal,
    pub declarado_transferencia: Decimal,
    pub declarado_qr: Decimal,
    pub desvio: Decimal,
    pub desvio_pct: Decimal,
    pub clasificacion: String,
    pub observaciones: Option<String>,
    pub closed_at: DateTime<Utc>,
}

/// Transition `abierta` → `cerrada`. Returns false when the session was
/// already closed (the guard clause in the WHERE races are resolved here).
pub async fn cerrar_sesion(
    pool: &PgPool,
    id: Uuid,
    cierre: CierreSesion,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sesiones_caja SET
            monto_esperado = $2, monto_declarado = $3,
            declarado_efectivo = $4, declarado_debito = $5, declarado_credito = $6,
            declarado_transferencia = $7, declarado_qr = $8,
            desvio = $9, desvio_pct = $10, clasificacion_desvio = $11,
            observaciones = $12, closed_at = $13, estado = 'cerrada'
        WHERE id = $1 AND estado = 'abierta'
        "#,
    )
    .bind(id)
    .bind(cierre.monto_esperado)
    .bind(cierre.monto_declarado)
    .bind(cierre.declarado_efectivo)
    .bind(cierre.declarado_debito)
    .bind(cierre.declarado_credito)
    .bind(cierre.declarado_transferencia)
    .bind(cierre.declarado_qr)
    .bind(cierre.desvio)
    .bind(cierre.desvio_pct)
    .bind(&cierre.clasificacion)
    .bind(&cierre.observaciones)
    .bind(cierre.closed_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_sesiones(
    pool: &PgPool,
    page: i64,
    limit: i64,
) -> Result<(Vec<SesionCaja>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sesiones_caja")
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query_as::<_, SesionCaja>(&format!(
        "SELECT {SESION_COLS} FROM sesiones_caja ORDER BY opened_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(pool)
    .await?;
    Ok((rows, total))
}

// ==================== Movements ====================

pub struct NuevoMovimiento {
    pub sesion_caja_id: Uuid,
    pub tipo: String,
    pub metodo_pago: Option<String>,
    pub monto: Decimal,
    pub descripcion: String,
    pub referencia_id: Option<Uuid>,
}

pub async fn insert_movimiento(
    pool: &PgPool,
    mov: NuevoMovimiento,
) -> Result<MovimientoCaja, sqlx::Error> {
    sqlx::query_as::<_, MovimientoCaja>(&format!(
        r#"
        INSERT INTO movimientos_caja
            (id, sesion_caja_id, tipo, metodo_pago, monto, descripcion, referencia_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        RETURNING {MOVIMIENTO_COLS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(mov.sesion_caja_id)
    .bind(&mov.tipo)
    .bind(&mov.metodo_pago)
    .bind(mov.monto)
    .bind(&mov.descripcion)
    .bind(mov.referencia_id)
    .fetch_one(pool)
    .await
}

/// Same append, but inside the sale-commit transaction
pub async fn insert_movimiento_tx(
    tx: &mut PgConnection,
    mov: NuevoMovimiento,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO movimientos_caja
            (id, sesion_caja_id, tipo, metodo_pago, monto, descripcion, referencia_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(mov.sesion_caja_id)
    .bind(&mov.tipo)
    .bind(&mov.metodo_pago)
    .bind(mov.monto)
    .bind(&mov.descripcion)
    .bind(mov.referencia_id)
    .execute(tx)
    .await?;
    Ok(())
}

pub async fn list_movimientos(
    pool: &PgPool,
    sesion_id: Uuid,
) -> Result<Vec<MovimientoCaja>, sqlx::Error> {
    sqlx::query_as::<_, MovimientoCaja>(&format!(
        "SELECT {MOVIMIENTO_COLS} FROM movimientos_caja \
         WHERE sesion_caja_id = $1 ORDER BY created_at"
    ))
    .bind(sesion_id)
    .fetch_all(pool)
    .await
}

/// Per-method sum over the immutable ledger. Non-monetary entries
/// (`metodo_pago IS NULL`) are excluded.
pub async fn sum_movimientos_por_metodo(
    pool: &PgPool,
    sesion_id: Uuid,
) -> Result<HashMap<String, Decimal>, sqlx::Error> {
    let rows: Vec<(String, Decimal)> = sqlx::query_as(
        r#"
        SELECT metodo_pago, COALESCE(SUM(monto), 0)
        FROM movimientos_caja
        WHERE sesion_caja_id = $1 AND metodo_pago IS NOT NULL
        GROUP BY metodo_pago
        "#,
    )
    .bind(sesion_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}
