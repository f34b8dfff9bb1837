//! Product catalog endpoints
//!
//! Catalog management is admin-only; the barcode price lookup is the one
//! public, read-only route (cashier terminals hit it without a token).
//! Every price change appends to the price history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::money::margin_pct;
use shared::{AppError, AppResult};
use uuid::Uuid;

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db::db_err;
use crate::db::models::{HistorialPrecio, Producto, Rol};
use crate::db::repository::historial_precio::{self, NuevoHistorial};
use crate::db::repository::producto::{self, NuevoProducto, ProductoUpdate};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProductoResponse {
    pub id: Uuid,
    pub codigo_barras: String,
    pub nombre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    pub categoria: String,
    pub precio_costo: Decimal,
    pub precio_venta: Decimal,
    pub margen_pct: Decimal,
    pub stock_actual: i32,
    pub stock_minimo: i32,
    pub es_padre: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proveedor_id: Option<Uuid>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Producto> for ProductoResponse {
    fn from(p: Producto) -> Self {
        Self {
            id: p.id,
            codigo_barras: p.codigo_barras,
            nombre: p.nombre,
            descripcion: p.descripcion,
            categoria: p.categoria,
            precio_costo: p.precio_costo,
            precio_venta: p.precio_venta,
            margen_pct: p.margen_pct,
            stock_actual: p.stock_actual,
            stock_minimo: p.stock_minimo,
            es_padre: p.es_padre,
            proveedor_id: p.proveedor_id,
            activo: p.activo,
            created_at: p.created_at,
        }
    }
}

fn validar_precios(costo: Decimal, venta: Decimal) -> AppResult<()> {
    if costo < Decimal::ZERO {
        return Err(AppError::validation("precio_costo no puede ser negativo")
            .with_field("precio_costo", "min"));
    }
    if venta < Decimal::ZERO {
        return Err(AppError::validation("precio_venta no puede ser negativo")
            .with_field("precio_venta", "min"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CrearProductoRequest {
    pub codigo_barras: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    #[serde(default = "categoria_default")]
    pub categoria: String,
    pub precio_costo: Decimal,
    pub precio_venta: Decimal,
    #[serde(default)]
    pub stock_actual: i32,
    #[serde(default = "stock_minimo_default")]
    pub stock_minimo: i32,
    #[serde(default)]
    pub es_padre: bool,
    pub proveedor_id: Option<Uuid>,
}

fn categoria_default() -> String {
    "general".to_string()
}

fn stock_minimo_default() -> i32 {
    5
}

/// POST /v1/productos
pub async fn crear(
    State(state): State<AppState>,
    actor: CurrentUser,
    Json(req): Json<CrearProductoRequest>,
) -> Result<(StatusCode, Json<ProductoResponse>), AppError> {
    actor.require_rol(&[Rol::Administrador])?;
    validar_precios(req.precio_costo, req.precio_venta)?;
    if req.codigo_barras.trim().is_empty() {
        return Err(AppError::validation("codigo_barras es requerido")
            .with_field("codigo_barras", "required"));
    }

    if producto::find_by_barcode(&state.pool, &req.codigo_barras)
        .await
        .map_err(db_err)?
        .is_some()
    {
        return Err(AppError::with_message(
            shared::ErrorCode::AlreadyExists,
            "ya existe un producto con ese código de barras",
        ));
    }

    let creado = producto::create(
        &state.pool,
        NuevoProducto {
            margen_pct: margin_pct(req.precio_costo, req.precio_venta),
            codigo_barras: req.codigo_barras,
            nombre: req.nombre,
            descripcion: req.descripcion,
            categoria: req.categoria,
            precio_costo: req.precio_costo,
            precio_venta: req.precio_venta,
            stock_actual: req.stock_actual,
            stock_minimo: req.stock_minimo,
            es_padre: req.es_padre,
            proveedor_id: req.proveedor_id,
        },
    )
    .await
    .map_err(db_err)?;

    Ok((StatusCode::CREATED, Json(creado.into())))
}

#[derive(Debug, Deserialize)]
pub struct ListarProductosQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub buscar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductoListResponse {
    pub data: Vec<ProductoResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// GET /v1/productos
pub async fn listar(
    State(state): State<AppState>,
    actor: CurrentUser,
    Query(query): Query<ListarProductosQuery>,
) -> ApiResult<ProductoListResponse> {
    actor.require_rol(&[Rol::Administrador])?;
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let (productos, total) =
        producto::list(&state.pool, page, limit, query.buscar.as_deref())
            .await
            .map_err(db_err)?;

    Ok(Json(ProductoListResponse {
        data: productos.into_iter().map(Into::into).collect(),
        total,
        page,
        limit,
    }))
}

/// GET /v1/productos/{id}
pub async fn obtener(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ProductoResponse> {
    actor.require_rol(&[Rol::Administrador])?;
    producto::find_by_id(&state.pool, id)
        .await
        .map_err(db_err)?
        .map(|p| Json(p.into()))
        .ok_or_else(|| AppError::not_found("producto"))
}

#[derive(Debug, Deserialize)]
pub struct ActualizarProductoRequest {
    pub nombre: String,
    pub descripcion: Option<String>,
    #[serde(default = "categoria_default")]
    pub categoria: String,
    pub precio_costo: Decimal,
    pub precio_venta: Decimal,
    pub stock_minimo: i32,
    pub proveedor_id: Option<Uuid>,
    #[serde(default = "activo_default")]
    pub activo: bool,
}

fn activo_default() -> bool {
    true
}

/// PUT /v1/productos/{id}
pub async fn actualizar(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ActualizarProductoRequest>,
) -> ApiResult<ProductoResponse> {
    actor.require_rol(&[Rol::Administrador])?;
    validar_precios(req.precio_costo, req.precio_venta)?;

    let anterior = producto::find_by_id(&state.pool, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("producto"))?;

    let cambio_precio =
        anterior.precio_costo != req.precio_costo || anterior.precio_venta != req.precio_venta;

    let actualizado = producto::update(
        &state.pool,
        id,
        ProductoUpdate {
            margen_pct: margin_pct(req.precio_costo, req.precio_venta),
            nombre: req.nombre,
            descripcion: req.descripcion,
            categoria: req.categoria,
            precio_costo: req.precio_costo,
            precio_venta: req.precio_venta,
            stock_minimo: req.stock_minimo,
            proveedor_id: req.proveedor_id,
            activo: req.activo,
        },
    )
    .await
    .map_err(db_err)?
    .ok_or_else(|| AppError::not_found("producto"))?;

    if cambio_precio {
        historial_precio::insert(
            &state.pool,
            NuevoHistorial {
                producto_id: id,
                proveedor_id: actualizado.proveedor_id,
                precio_costo_anterior: anterior.precio_costo,
                precio_costo_nuevo: actualizado.precio_costo,
                precio_venta_anterior: anterior.precio_venta,
                precio_venta_nuevo: actualizado.precio_venta,
                porcentaje_aplicado: Decimal::ZERO,
                motivo: "Actualización manual".to_string(),
            },
        )
        .await
        .map_err(db_err)?;
    }

    Ok(Json(actualizado.into()))
}

/// DELETE /v1/productos/{id} - soft delete
pub async fn desactivar(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    actor.require_rol(&[Rol::Administrador])?;

    let p = producto::find_by_id(&state.pool, id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("producto"))?;

    producto::update(
        &state.pool,
        id,
        ProductoUpdate {
            nombre: p.nombre,
            descripcion: p.descripcion,
            categoria: p.categoria,
            precio_costo: p.precio_costo,
            precio_venta: p.precio_venta,
            margen_pct: p.margen_pct,
            stock_minimo: p.stock_minimo,
            proveedor_id: p.proveedor_id,
            activo: false,
        },
    )
    .await
    .map_err(db_err)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct HistorialPrecioResponse {
    pub precio_costo_anterior: Decimal,
    pub precio_costo_nuevo: Decimal,
    pub precio_venta_anterior: Decimal,
    pub precio_venta_nuevo: Decimal,
    pub porcentaje_aplicado: Decimal,
    pub motivo: String,
    pub created_at: DateTime<Utc>,
}

impl From<HistorialPrecio> for HistorialPrecioResponse {
    fn from(h: HistorialPrecio) -> Self {
        Self {
            precio_costo_anterior: h.precio_costo_anterior,
            precio_costo_nuevo: h.precio_costo_nuevo,
            precio_venta_anterior: h.precio_venta_anterior,
            precio_venta_nuevo: h.precio_venta_nuevo,
            porcentaje_aplicado: h.porcentaje_aplicado,
            motivo: h.motivo,
            created_at: h.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistorialQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /v1/productos/{id}/historial - price-change history
pub async fn historial_precios(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<HistorialQuery>,
) -> ApiResult<Vec<HistorialPrecioResponse>> {
    actor.require_rol(&[Rol::Administrador, Rol::Supervisor])?;
    let (historial, _) = historial_precio::list_by_producto(
        &state.pool,
        id,
        query.page.unwrap_or(1).max(1),
        query.limit.unwrap_or(50).clamp(1, 200),
    )
    .await
    .map_err(db_err)?;

    Ok(Json(historial.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Serialize)]
pub struct PrecioResponse {
    pub codigo_barras: String,
    pub nombre: String,
    pub precio_venta: Decimal,
}

/// GET /v1/precio/{barcode} - public, read-only price lookup
pub async fn precio_por_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> ApiResult<PrecioResponse> {
    let p = producto::find_by_barcode(&state.pool, &barcode)
        .await
        .map_err(db_err)?
        .filter(|p| p.activo)
        .ok_or_else(|| AppError::not_found("producto"))?;

    Ok(Json(PrecioResponse {
        codigo_barras: p.codigo_barras,
        nombre: p.nombre,
        precio_venta: p.precio_venta,
    }))
}
