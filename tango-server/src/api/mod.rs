//! HTTP surface
//!
//! All routes live under `/v1` except `/health`. Authentication is a single
//! middleware that skips the public paths; per-endpoint role sets are
//! enforced in the handlers through [`CurrentUser::require_rol`].
//!
//! [`CurrentUser::require_rol`]: crate::auth::CurrentUser::require_rol

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::{middleware::require_auth, rate_limit};
use crate::state::AppState;

pub mod auth;
pub mod caja;
pub mod facturacion;
pub mod health;
pub mod inventario;
pub mod productos;
pub mod ventas;

/// Handlers return `Json<T>` or the structured error envelope
pub type ApiResult<T> = Result<axum::Json<T>, shared::AppError>;

pub fn router(state: AppState) -> Router {
    // Login gets its own, stricter rate limit
    let login = Router::new()
        .route("/v1/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::login_rate_limit,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(login)
        .route("/v1/auth/refresh", post(auth::refresh))
        .route("/v1/precio/{barcode}", get(productos::precio_por_barcode))
        // Sales
        .route("/v1/ventas", post(ventas::registrar).get(ventas::listar))
        .route("/v1/ventas/sync-batch", post(ventas::sync_batch))
        .route("/v1/ventas/{id}", delete(ventas::anular))
        // Cash sessions
        .route("/v1/caja/abrir", post(caja::abrir))
        .route("/v1/caja/arqueo", post(caja::arqueo))
        .route("/v1/caja/movimiento", post(caja::movimiento))
        .route("/v1/caja/activa", get(caja::activa))
        .route("/v1/caja/historial", get(caja::historial))
        .route("/v1/caja/{id}/reporte", get(caja::reporte))
        // Receipts - GET takes the sale id, DELETE the comprobante id
        .route("/v1/facturacion/pdf/{id}", get(facturacion::descargar_pdf))
        .route(
            "/v1/facturacion/{id}",
            get(facturacion::por_venta).delete(facturacion::anular),
        )
        .route(
            "/v1/facturacion/{id}/reintentar",
            post(facturacion::reintentar),
        )
        // Inventory
        .route(
            "/v1/inventario/vinculos",
            post(inventario::crear_vinculo).get(inventario::listar_vinculos),
        )
        .route("/v1/inventario/desarme", post(inventario::desarme_manual))
        .route("/v1/inventario/ajuste", post(inventario::ajuste_manual))
        .route("/v1/inventario/alertas", get(inventario::alertas))
        // Products
        .route(
            "/v1/productos",
            post(productos::crear).get(productos::listar),
        )
        .route(
            "/v1/productos/{id}",
            get(productos::obtener)
                .put(productos::actualizar)
                .delete(productos::desactivar),
        )
        .route(
            "/v1/productos/{id}/historial",
            get(productos::historial_precios),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::global_rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
