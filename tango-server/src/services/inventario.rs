//! Inventory engine
//!
//! Stock decrements with automatic disassembly, the explicit manual
//! disassembly, low-stock alerts and parent-child link management. Every
//! stock mutation records exactly one movement in the same transaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{AppError, AppResult, ErrorCode};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::models::{ProductoHijo, TipoMovimientoStock};
use crate::db::repository::{movimiento_stock, producto};
use crate::db::{db_err, repository::movimiento_stock::NuevoMovimientoStock};
use crate::state::AppState;

/// Parents needed to cover a deficit (ceiling division)
fn padres_necesarios(deficit: i32, unidades_por_padre: i32) -> i32 {
    (deficit + unidades_por_padre - 1) / unidades_por_padre
}

/// Any directed path `from ⇒ to` over the existing edge set?
/// Used to keep the product graph acyclic on link creation.
fn path_exists(edges: &[(Uuid, Uuid)], from: Uuid, to: Uuid) -> bool {
    let mut stack = vec![from];
    let mut visited = Vec::new();

    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if visited.contains(&node) {
            continue;
        }
        visited.push(node);
        for (padre, hijo) in edges {
            if *padre == node {
                stack.push(*hijo);
            }
        }
    }
    false
}

async fn registrar_movimiento(
    tx: &mut PgConnection,
    producto_id: Uuid,
    tipo: TipoMovimientoStock,
    delta: i32,
    stock_anterior: i32,
    motivo: &str,
    referencia_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    movimiento_stock::insert_tx(
        tx,
        NuevoMovimientoStock {
            producto_id,
            tipo: tipo.as_str().to_string(),
            cantidad: delta,
            stock_anterior,
            stock_nuevo: stock_anterior + delta,
            motivo: motivo.to_string(),
            referencia_id,
        },
    )
    .await
}

/// Decrement stock for one sale line inside the sale transaction.
///
/// Returns `true` when the line could not be fully covered (the caller flags
/// the sale with `conflicto_stock`). When an auto-disassembly link covers the
/// deficit, the parent−/child+ cascade runs in the same transaction and is
/// recorded as `desarme` movements before the `venta` movement.
pub async fn descontar_stock_tx(
    tx: &mut PgConnection,
    producto_id: Uuid,
    cantidad: i32,
    motivo: &str,
    referencia_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let prod = producto::find_by_id_tx(tx, producto_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    // Sufficient stock: plain decrement
    if prod.stock_actual >= cantidad {
        producto::update_stock_tx(tx, producto_id, -cantidad).await?;
        registrar_movimiento(
            tx,
            producto_id,
            TipoMovimientoStock::Venta,
            -cantidad,
            prod.stock_actual,
            motivo,
            referencia_id,
        )
        .await?;
        return Ok(false);
    }

    // Deficit: try the auto-disassembly link
    let vinculo = producto::find_vinculo_auto_by_hijo(tx, producto_id).await?;
    let Some(vinculo) = vinculo else {
        // No link - decrement anyway (stock may go negative), caller flags it
        producto::update_stock_tx(tx, producto_id, -cantidad).await?;
        registrar_movimiento(
            tx,
            producto_id,
            TipoMovimientoStock::Venta,
            -cantidad,
            prod.stock_actual,
            motivo,
            referencia_id,
        )
        .await?;
        return Ok(true);
    };

    let deficit = cantidad - prod.stock_actual;
    let padres = padres_necesarios(deficit, vinculo.unidades_por_padre);

    let padre = producto::find_by_id_tx(tx, vinculo.producto_padre_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    if padre.stock_actual < padres {
        // Parent cannot cover either - same negative-stock path
        producto::update_stock_tx(tx, producto_id, -cantidad).await?;
        registrar_movimiento(
            tx,
            producto_id,
            TipoMovimientoStock::Venta,
            -cantidad,
            prod.stock_actual,
            motivo,
            referencia_id,
        )
        .await?;
        return Ok(true);
    }

    // Cascade: parent−, child+, then the sale decrement on the child
    let generadas = padres * vinculo.unidades_por_padre;
    let motivo_desarme = format!("Desarme automático ({motivo})");

    producto::update_stock_tx(tx, vinculo.producto_padre_id, -padres).await?;
    registrar_movimiento(
        tx,
        vinculo.producto_padre_id,
        TipoMovimientoStock::Desarme,
        -padres,
        padre.stock_actual,
        &motivo_desarme,
        referencia_id,
    )
    .await?;

    producto::update_stock_tx(tx, producto_id, generadas).await?;
    registrar_movimiento(
        tx,
        producto_id,
        TipoMovimientoStock::Desarme,
        generadas,
        prod.stock_actual,
        &motivo_desarme,
        referencia_id,
    )
    .await?;

    producto::update_stock_tx(tx, producto_id, -cantidad).await?;
    registrar_movimiento(
        tx,
        producto_id,
        TipoMovimientoStock::Venta,
        -cantidad,
        prod.stock_actual + generadas,
        motivo,
        referencia_id,
    )
    .await?;

    Ok(false)
}

/// Restore stock for one cancelled sale line inside the cancel transaction
pub async fn restaurar_stock_tx(
    tx: &mut PgConnection,
    producto_id: Uuid,
    cantidad: i32,
    motivo: &str,
    referencia_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    let prod = producto::find_by_id_tx(tx, producto_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    producto::update_stock_tx(tx, producto_id, cantidad).await?;
    registrar_movimiento(
        tx,
        producto_id,
        TipoMovimientoStock::RestoreAnulacion,
        cantidad,
        prod.stock_actual,
        motivo,
        referencia_id,
    )
    .await
}

// ==================== Link management ====================

#[derive(Debug, Deserialize)]
pub struct CrearVinculoRequest {
    pub producto_padre_id: Uuid,
    pub producto_hijo_id: Uuid,
    pub unidades_por_padre: i32,
    #[serde(default)]
    pub desarme_auto: bool,
}

#[derive(Debug, Serialize)]
pub struct VinculoResponse {
    pub id: Uuid,
    pub producto_padre_id: Uuid,
    pub producto_hijo_id: Uuid,
    pub unidades_por_padre: i32,
    pub desarme_auto: bool,
}

impl From<ProductoHijo> for VinculoResponse {
    fn from(v: ProductoHijo) -> Self {
        Self {
            id: v.id,
            producto_padre_id: v.producto_padre_id,
            producto_hijo_id: v.producto_hijo_id,
            unidades_por_padre: v.unidades_por_padre,
            desarme_auto: v.desarme_auto,
        }
    }
}

pub async fn crear_vinculo(
    state: &AppState,
    req: CrearVinculoRequest,
) -> AppResult<VinculoResponse> {
    if req.producto_padre_id == req.producto_hijo_id {
        return Err(AppError::validation(
            "un producto no puede ser hijo de sí mismo",
        ));
    }
    if req.unidades_por_padre < 1 {
        return Err(AppError::validation("unidades_por_padre debe ser positivo")
            .with_field("unidades_por_padre", "min"));
    }

    producto::find_by_id(&state.pool, req.producto_padre_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("producto padre"))?;
    producto::find_by_id(&state.pool, req.producto_hijo_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("producto hijo"))?;

    if producto::find_vinculo_by_par(&state.pool, req.producto_padre_id, req.producto_hijo_id)
        .await
        .map_err(db_err)?
        .is_some()
    {
        return Err(AppError::with_message(
            ErrorCode::AlreadyExists,
            "el vínculo ya existe",
        ));
    }

    // Reject any edge that would close a directed cycle
    let edges = producto::list_vinculo_edges(&state.pool)
        .await
        .map_err(db_err)?;
    if path_exists(&edges, req.producto_hijo_id, req.producto_padre_id) {
        return Err(AppError::new(ErrorCode::CyclicLink));
    }

    let vinculo = producto::create_vinculo(
        &state.pool,
        req.producto_padre_id,
        req.producto_hijo_id,
        req.unidades_por_padre,
        req.desarme_auto,
    )
    .await
    .map_err(db_err)?;

    Ok(vinculo.into())
}

pub async fn listar_vinculos(state: &AppState) -> AppResult<Vec<VinculoResponse>> {
    let vinculos = producto::list_vinculos(&state.pool).await.map_err(db_err)?;
    Ok(vinculos.into_iter().map(Into::into).collect())
}

// ==================== Manual disassembly ====================

#[derive(Debug, Deserialize)]
pub struct DesarmeManualRequest {
    pub vinculo_id: Uuid,
    pub cantidad_padres: i32,
}

#[derive(Debug, Serialize)]
pub struct DesarmeManualResponse {
    pub vinculo_id: Uuid,
    pub padres_desarmados: i32,
    pub unidades_generadas: i32,
}

pub async fn desarme_manual(
    state: &AppState,
    req: DesarmeManualRequest,
) -> AppResult<DesarmeManualResponse> {
    if req.cantidad_padres < 1 {
        return Err(AppError::validation("cantidad_padres debe ser positivo")
            .with_field("cantidad_padres", "min"));
    }

    let vinculo = producto::find_vinculo_by_id(&state.pool, req.vinculo_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("vínculo"))?;

    let padre = producto::find_by_id(&state.pool, vinculo.producto_padre_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("producto padre"))?;

    if padre.stock_actual < req.cantidad_padres {
        return Err(AppError::with_message(
            ErrorCode::InsufficientParentStock,
            format!(
                "stock insuficiente: disponible {}, solicitado {}",
                padre.stock_actual, req.cantidad_padres
            ),
        ));
    }

    let generadas = req.cantidad_padres * vinculo.unidades_por_padre;
    let motivo = format!("Desarme manual vínculo {}", vinculo.id);

    let mut tx = state.pool.begin().await.map_err(db_err)?;

    registrar_par_desarme(
        &mut tx,
        &vinculo,
        req.cantidad_padres,
        generadas,
        &motivo,
    )
    .await
    .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;

    Ok(DesarmeManualResponse {
        vinculo_id: vinculo.id,
        padres_desarmados: req.cantidad_padres,
        unidades_generadas: generadas,
    })
}

async fn registrar_par_desarme(
    tx: &mut PgConnection,
    vinculo: &ProductoHijo,
    padres: i32,
    generadas: i32,
    motivo: &str,
) -> Result<(), sqlx::Error> {
    let padre = producto::find_by_id_tx(tx, vinculo.producto_padre_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    let hijo = producto::find_by_id_tx(tx, vinculo.producto_hijo_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    producto::update_stock_tx(tx, vinculo.producto_padre_id, -padres).await?;
    registrar_movimiento(
        tx,
        vinculo.producto_padre_id,
        TipoMovimientoStock::Desarme,
        -padres,
        padre.stock_actual,
        motivo,
        None,
    )
    .await?;

    producto::update_stock_tx(tx, vinculo.producto_hijo_id, generadas).await?;
    registrar_movimiento(
        tx,
        vinculo.producto_hijo_id,
        TipoMovimientoStock::Desarme,
        generadas,
        hijo.stock_actual,
        motivo,
        None,
    )
    .await
}

// ==================== Alerts and manual adjustment ====================

#[derive(Debug, Serialize)]
pub struct AlertaStockResponse {
    pub producto_id: Uuid,
    pub nombre: String,
    pub stock_actual: i32,
    pub stock_minimo: i32,
    pub precio_venta: Decimal,
}

/// Active products at or below their minimum stock
pub async fn alertas_stock(state: &AppState) -> AppResult<Vec<AlertaStockResponse>> {
    let productos = producto::low_stock(&state.pool).await.map_err(db_err)?;
    Ok(productos
        .into_iter()
        .map(|p| AlertaStockResponse {
            producto_id: p.id,
            nombre: p.nombre,
            stock_actual: p.stock_actual,
            stock_minimo: p.stock_minimo,
            precio_venta: p.precio_venta,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct AjusteManualRequest {
    pub producto_id: Uuid,
    /// Signed delta
    pub cantidad: i32,
    pub motivo: String,
}

#[derive(Debug, Serialize)]
pub struct AjusteManualResponse {
    pub producto_id: Uuid,
    pub stock_anterior: i32,
    pub stock_nuevo: i32,
}

pub async fn ajuste_manual(
    state: &AppState,
    req: AjusteManualRequest,
) -> AppResult<AjusteManualResponse> {
    if req.cantidad == 0 {
        return Err(AppError::validation("cantidad no puede ser cero")
            .with_field("cantidad", "nonzero"));
    }

    let mut tx = state.pool.begin().await.map_err(db_err)?;

    let prod = producto::find_by_id_tx(&mut tx, req.producto_id)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::not_found("producto"))?;

    producto::update_stock_tx(&mut tx, req.producto_id, req.cantidad)
        .await
        .map_err(db_err)?;
    registrar_movimiento(
        &mut tx,
        req.producto_id,
        TipoMovimientoStock::AjusteManual,
        req.cantidad,
        prod.stock_actual,
        &req.motivo,
        None,
    )
    .await
    .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;

    Ok(AjusteManualResponse {
        producto_id: req.producto_id,
        stock_anterior: prod.stock_actual,
        stock_nuevo: prod.stock_actual + req.cantidad,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padres_necesarios_ceiling() {
        assert_eq!(padres_necesarios(1, 6), 1);
        assert_eq!(padres_necesarios(6, 6), 1);
        assert_eq!(padres_necesarios(7, 6), 2);
        assert_eq!(padres_necesarios(12, 6), 2);
        assert_eq!(padres_necesarios(13, 6), 3);
        assert_eq!(padres_necesarios(5, 1), 5);
    }

    #[test]
    fn test_path_exists_direct_and_transitive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let edges = vec![(a, b), (b, c)];

        assert!(path_exists(&edges, a, b));
        assert!(path_exists(&edges, a, c));
        assert!(!path_exists(&edges, c, a));
        assert!(!path_exists(&edges, b, a));
    }

    #[test]
    fn test_path_exists_handles_diamond() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        // a -> b -> d, a -> c -> d
        let edges = vec![(a, b), (a, c), (b, d), (c, d)];
        assert!(path_exists(&edges, a, d));
        assert!(!path_exists(&edges, d, a));
    }
}
