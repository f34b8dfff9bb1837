//! Receipt repository

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Comprobante, ESTADO_PENDIENTE};

const COMPROBANTE_COLS: &str = "id, venta_id, tipo, numero, punto_de_venta, cae, \
     cae_vencimiento, receptor_cuit, receptor_nombre, monto_neto, monto_iva, monto_total, \
     estado, pdf_path, observaciones, retry_count, next_retry_at, last_error, \
     created_at, updated_at";

pub struct NuevoComprobante {
    pub venta_id: Uuid,
    pub tipo: String,
    pub punto_de_venta: i32,
    pub monto_neto: Decimal,
    pub monto_iva: Decimal,
    pub monto_total: Decimal,
}

pub async fn create(pool: &PgPool, data: NuevoComprobante) -> Result<Comprobante, sqlx::Error> {
    sqlx::query_as::<_, Comprobante>(&format!(
        r#"
        INSERT INTO comprobantes
            (id, venta_id, tipo, punto_de_venta, monto_neto, monto_iva, monto_total,
             estado, retry_count, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pendiente', 0, now(), now())
        RETURNING {COMPROBANTE_COLS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(data.venta_id)
    .bind(&data.tipo)
    .bind(data.punto_de_venta)
    .bind(data.monto_neto)
    .bind(data.monto_iva)
    .bind(data.monto_total)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Comprobante>, sqlx::Error> {
    sqlx::query_as::<_, Comprobante>(&format!(
        "SELECT {COMPROBANTE_COLS} FROM comprobantes WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_venta_id(
    pool: &PgPool,
    venta_id: Uuid,
) -> Result<Option<Comprobante>, sqlx::Error> {
    sqlx::query_as::<_, Comprobante>(&format!(
        "SELECT {COMPROBANTE_COLS} FROM comprobantes \
         WHERE venta_id = $1 ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(venta_id)
    .fetch_optional(pool)
    .await
}

/// Mark issued: store CAE + expiry, clear retry fields
pub async fn marcar_emitido(
    pool: &PgPool,
    id: Uuid,
    cae: &str,
    cae_vencimiento: Option<NaiveDate>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE comprobantes SET
            estado = 'emitido', cae = $2, cae_vencimiento = $3,
            retry_count = 0, next_retry_at = NULL, last_error = NULL, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(cae)
    .bind(cae_vencimiento)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark rejected by the authority - terminal, never retried automatically
pub async fn marcar_rechazado(
    pool: &PgPool,
    id: Uuid,
    observaciones: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE comprobantes SET
            estado = 'rechazado', observaciones = $2, next_retry_at = NULL, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(observaciones)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a failed attempt. When `agotado` the receipt settles in `error`.
pub async fn registrar_fallo(
    pool: &PgPool,
    id: Uuid,
    retry_count: i32,
    next_retry_at: Option<DateTime<Utc>>,
    last_error: &str,
    agotado: bool,
) -> Result<(), sqlx::Error> {
    let estado = if agotado { "error" } else { ESTADO_PENDIENTE };
    sqlx::query(
        r#"
        UPDATE comprobantes SET
            estado = $2, retry_count = $3, next_retry_at = $4, last_error = $5, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(estado)
    .bind(retry_count)
    .bind(next_retry_at)
    .bind(last_error)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn marcar_anulado(
    pool: &PgPool,
    id: Uuid,
    observaciones: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE comprobantes SET estado = 'anulado', observaciones = $2, updated_at = now() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(observaciones)
    .execute(pool)
    .await?;
    Ok(())
}

/// Reset for manual retry: back to `pendiente`, counter cleared, due now
pub async fn resetear_para_reintento(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE comprobantes SET
            estado = 'pendiente', retry_count = 0, next_retry_at = now(),
            last_error = NULL, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_pdf_path(pool: &PgPool, id: Uuid, pdf_path: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE comprobantes SET pdf_path = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(pdf_path)
        .execute(pool)
        .await?;
    Ok(())
}

/// Pending receipts whose `next_retry_at` is due, oldest first
pub async fn list_pending_retries(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Comprobante>, sqlx::Error> {
    sqlx::query_as::<_, Comprobante>(&format!(
        "SELECT {COMPROBANTE_COLS} FROM comprobantes \
         WHERE estado = 'pendiente' AND next_retry_at IS NOT NULL AND next_retry_at <= $1 \
         ORDER BY next_retry_at LIMIT $2"
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}
