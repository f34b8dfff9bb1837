//! Sale repository
//!
//! The sale aggregate (header + items + payments) is only ever written inside
//! an open transaction; the ticket number comes from a Postgres sequence read
//! in that same transaction, which keeps numbering monotonic and gap-free
//! under concurrent commits.

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::models::{Venta, VentaCompleta, VentaItem, VentaPago, ESTADO_COMPLETADA};

const VENTA_COLS: &str = "id, numero_ticket, sesion_caja_id, usuario_id, subtotal, \
     descuento_total, total, estado, conflicto_stock, offline_id, created_at";

/// Next ticket number, allocated inside the committing transaction
pub async fn next_ticket_number(tx: &mut PgConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT nextval('ventas_numero_ticket_seq')")
        .fetch_one(tx)
        .await
}

pub async fn insert_venta_tx(tx: &mut PgConnection, v: &Venta) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO ventas
            (id, numero_ticket, sesion_caja_id, usuario_id, subtotal, descuento_total,
             total, estado, conflicto_stock, offline_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(v.id)
    .bind(v.numero_ticket)
    .bind(v.sesion_caja_id)
    .bind(v.usuario_id)
    .bind(v.subtotal)
    .bind(v.descuento_total)
    .bind(v.total)
    .bind(&v.estado)
    .bind(v.conflicto_stock)
    .bind(&v.offline_id)
    .bind(v.created_at)
    .execute(tx)
    .await?;
    Ok(())
}

pub async fn insert_item_tx(tx: &mut PgConnection, item: &VentaItem) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO venta_items
            (id, venta_id, producto_id, orden, cantidad, precio_unitario, descuento_item, subtotal)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(item.id)
    .bind(item.venta_id)
    .bind(item.producto_id)
    .bind(item.orden)
    .bind(item.cantidad)
    .bind(item.precio_unitario)
    .bind(item.descuento_item)
    .bind(item.subtotal)
    .execute(tx)
    .await?;
    Ok(())
}

pub async fn insert_pago_tx(tx: &mut PgConnection, pago: &VentaPago) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO venta_pagos (id, venta_id, metodo, monto) VALUES ($1, $2, $3, $4)")
        .bind(pago.id)
        .bind(pago.venta_id)
        .bind(&pago.metodo)
        .bind(pago.monto)
        .execute(tx)
        .await?;
    Ok(())
}

/// Raise the conflict flag when a decrement inside the transaction found less
/// stock than the pre-flight probe did (a concurrent sale got there first)
pub async fn update_conflicto_stock_tx(
    tx: &mut PgConnection,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ventas SET conflicto_stock = TRUE WHERE id = $1")
        .bind(id)
        .execute(tx)
        .await?;
    Ok(())
}

pub async fn update_estado_tx(
    tx: &mut PgConnection,
    id: Uuid,
    estado: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE ventas SET estado = $2 WHERE id = $1")
        .bind(id)
        .bind(estado)
        .execute(tx)
        .await?;
    Ok(())
}

async fn load_children(
    pool: &PgPool,
    venta_ids: &[Uuid],
) -> Result<(Vec<VentaItem>, Vec<VentaPago>), sqlx::Error> {
    let items = sqlx::query_as::<_, VentaItem>(
        "SELECT id, venta_id, producto_id, orden, cantidad, precio_unitario, descuento_item, subtotal \
         FROM venta_items WHERE venta_id = ANY($1) ORDER BY orden",
    )
    .bind(venta_ids)
    .fetch_all(pool)
    .await?;

    let pagos = sqlx::query_as::<_, VentaPago>(
        "SELECT id, venta_id, metodo, monto FROM venta_pagos WHERE venta_id = ANY($1) ORDER BY id",
    )
    .bind(venta_ids)
    .fetch_all(pool)
    .await?;

    Ok((items, pagos))
}

fn assemble(ventas: Vec<Venta>, items: Vec<VentaItem>, pagos: Vec<VentaPago>) -> Vec<VentaCompleta> {
    ventas
        .into_iter()
        .map(|venta| {
            let id = venta.id;
            VentaCompleta {
                items: items.iter().filter(|i| i.venta_id == id).cloned().collect(),
                pagos: pagos.iter().filter(|p| p.venta_id == id).cloned().collect(),
                venta,
            }
        })
        .collect()
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<VentaCompleta>, sqlx::Error> {
    let venta = sqlx::query_as::<_, Venta>(&format!(
        "SELECT {VENTA_COLS} FROM ventas WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(venta) = venta else { return Ok(None) };
    let (items, pagos) = load_children(pool, &[venta.id]).await?;
    Ok(assemble(vec![venta], items, pagos).pop())
}

pub async fn find_by_offline_id(
    pool: &PgPool,
    offline_id: &str,
) -> Result<Option<VentaCompleta>, sqlx::Error> {
    let venta = sqlx::query_as::<_, Venta>(&format!(
        "SELECT {VENTA_COLS} FROM ventas WHERE offline_id = $1"
    ))
    .bind(offline_id)
    .fetch_optional(pool)
    .await?;

    let Some(venta) = venta else { return Ok(None) };
    let (items, pagos) = load_children(pool, &[venta.id]).await?;
    Ok(assemble(vec![venta], items, pagos).pop())
}

/// List filter. `ordenar_por` is restricted to a known column set; anything
/// else falls back to `created_at`.
#[derive(Debug, Clone, Default)]
pub struct VentaFilter {
    pub fecha: Option<NaiveDate>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
    pub estado: Option<String>,
    pub page: i64,
    pub limit: i64,
    pub ordenar_por: Option<String>,
    pub descendente: bool,
}

fn order_column(requested: Option<&str>) -> &'static str {
    match requested {
        Some("numero_ticket") => "numero_ticket",
        Some("total") => "total",
        _ => "created_at",
    }
}

pub async fn list(
    pool: &PgPool,
    filter: &VentaFilter,
) -> Result<(Vec<VentaCompleta>, i64), sqlx::Error> {
    let mut conditions = Vec::new();
    let mut arg = 0;

    if filter.estado.is_some() {
        arg += 1;
        conditions.push(format!("estado = ${arg}"));
    }
    if filter.fecha.is_some() {
        arg += 1;
        conditions.push(format!("created_at::date = ${arg}"));
    }
    if filter.desde.is_some() {
        arg += 1;
        conditions.push(format!("created_at::date >= ${arg}"));
    }
    if filter.hasta.is_some() {
        arg += 1;
        conditions.push(format!("created_at::date <= ${arg}"));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let direction = if filter.descendente { "DESC" } else { "ASC" };
    let order = order_column(filter.ordenar_por.as_deref());
    let offset = (filter.page - 1) * filter.limit;

    let count_sql = format!("SELECT COUNT(*) FROM ventas {where_clause}");
    let list_sql = format!(
        "SELECT {VENTA_COLS} FROM ventas {where_clause} \
         ORDER BY {order} {direction} LIMIT {limit} OFFSET {offset}",
        limit = filter.limit,
    );

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    let mut list_query = sqlx::query_as::<_, Venta>(&list_sql);
    if let Some(estado) = &filter.estado {
        count_query = count_query.bind(estado.clone());
        list_query = list_query.bind(estado.clone());
    }
    if let Some(fecha) = filter.fecha {
        count_query = count_query.bind(fecha);
        list_query = list_query.bind(fecha);
    }
    if let Some(desde) = filter.desde {
        count_query = count_query.bind(desde);
        list_query = list_query.bind(desde);
    }
    if let Some(hasta) = filter.hasta {
        count_query = count_query.bind(hasta);
        list_query = list_query.bind(hasta);
    }

    let total = count_query.fetch_one(pool).await?;
    let ventas = list_query.fetch_all(pool).await?;

    if ventas.is_empty() {
        return Ok((Vec::new(), total));
    }

    let ids: Vec<Uuid> = ventas.iter().map(|v| v.id).collect();
    let (items, pagos) = load_children(pool, &ids).await?;
    Ok((assemble(ventas, items, pagos), total))
}

/// Completed-sale count for a session, used by the cash report
pub async fn count_completadas_by_sesion(
    pool: &PgPool,
    sesion_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM ventas WHERE sesion_caja_id = $1 AND estado = $2")
        .bind(sesion_id)
        .bind(ESTADO_COMPLETADA)
        .fetch_one(pool)
        .await
}
