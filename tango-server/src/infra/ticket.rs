//! Ticket document rendering
//!
//! Rendering is a pure function from a sale to a byte blob; the pipeline only
//! stores the resulting path. Documents land in
//! `{storage_root}/ticket_{numero}.pdf`.

use std::collections::HashMap;
use std::path::Path;

use uuid::Uuid;

use crate::db::models::VentaCompleta;

const LINE_WIDTH: usize = 42;

fn center(text: &str) -> String {
    if text.len() >= LINE_WIDTH {
        return text.to_string();
    }
    let pad = (LINE_WIDTH - text.len()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

fn row(left: &str, right: &str) -> String {
    let space = LINE_WIDTH.saturating_sub(left.len() + right.len()).max(1);
    format!("{}{}{}", left, " ".repeat(space), right)
}

/// Render the ticket body for a completed sale
pub fn render_ticket(venta: &VentaCompleta, nombres: &HashMap<Uuid, String>) -> Vec<u8> {
    let mut lines = Vec::new();
    let separator = "-".repeat(LINE_WIDTH);

    lines.push(center("TANGO POS"));
    lines.push(center(&format!("Ticket #{}", venta.venta.numero_ticket)));
    lines.push(venta.venta.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    lines.push(separator.clone());

    for item in &venta.items {
        let nombre = nombres
            .get(&item.producto_id)
            .map(String::as_str)
            .unwrap_or("producto");
        lines.push(row(
            &format!("{} x{}", nombre, item.cantidad),
            &format!("{}", item.subtotal),
        ));
        if !item.descuento_item.is_zero() {
            lines.push(row("  descuento", &format!("-{}", item.descuento_item)));
        }
    }

    lines.push(separator.clone());
    lines.push(row("SUBTOTAL", &format!("{}", venta.venta.subtotal)));
    if !venta.venta.descuento_total.is_zero() {
        lines.push(row("DESCUENTO", &format!("{}", venta.venta.descuento_total)));
    }
    lines.push(row("TOTAL", &format!("{}", venta.venta.total)));
    lines.push(separator);

    for pago in &venta.pagos {
        lines.push(row(&pago.metodo.to_uppercase(), &format!("{}", pago.monto)));
    }

    lines.push(String::new());
    lines.push(center("Gracias por su compra"));
    lines.push(String::new());

    lines.join("\n").into_bytes()
}

/// Write the rendered document and return its absolute path
pub async fn write_ticket(
    storage_root: &str,
    numero_ticket: i64,
    bytes: &[u8],
) -> std::io::Result<String> {
    tokio::fs::create_dir_all(storage_root).await?;
    let path = Path::new(storage_root).join(format!("ticket_{numero_ticket}.pdf"));
    tokio::fs::write(&path, bytes).await?;
    let absolute = std::path::absolute(&path)?;
    Ok(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Venta, VentaItem, VentaPago};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn venta_fixture() -> (VentaCompleta, HashMap<Uuid, String>) {
        let venta_id = Uuid::new_v4();
        let producto_id = Uuid::new_v4();
        let venta = Venta {
            id: venta_id,
            numero_ticket: 7,
            sesion_caja_id: Uuid::new_v4(),
            usuario_id: Uuid::new_v4(),
            subtotal: Decimal::from_str("750.00").unwrap(),
            descuento_total: Decimal::ZERO,
            total: Decimal::from_str("750.00").unwrap(),
            estado: "completada".into(),
            conflicto_stock: false,
            offline_id: None,
            created_at: Utc::now(),
        };
        let items = vec![VentaItem {
            id: Uuid::new_v4(),
            venta_id,
            producto_id,
            orden: 0,
            cantidad: 3,
            precio_unitario: Decimal::from_str("250.00").unwrap(),
            descuento_item: Decimal::ZERO,
            subtotal: Decimal::from_str("750.00").unwrap(),
        }];
        let pagos = vec![VentaPago {
            id: Uuid::new_v4(),
            venta_id,
            metodo: "efectivo".into(),
            monto: Decimal::from_str("750.00").unwrap(),
        }];
        let mut nombres = HashMap::new();
        nombres.insert(producto_id, "Yerba 1kg".to_string());
        (VentaCompleta { venta, items, pagos }, nombres)
    }

    #[test]
    fn test_render_contains_totals_and_items() {
        let (venta, nombres) = venta_fixture();
        let text = String::from_utf8(render_ticket(&venta, &nombres)).unwrap();
        assert!(text.contains("Ticket #7"));
        assert!(text.contains("Yerba 1kg x3"));
        assert!(text.contains("TOTAL"));
        assert!(text.contains("750.00"));
        assert!(text.contains("EFECTIVO"));
    }

    #[tokio::test]
    async fn test_write_ticket_path() {
        let (venta, nombres) = venta_fixture();
        let dir = std::env::temp_dir().join(format!("tango-tickets-{}", Uuid::new_v4()));
        let bytes = render_ticket(&venta, &nombres);
        let path = write_ticket(dir.to_str().unwrap(), 7, &bytes).await.unwrap();
        assert!(path.ends_with("ticket_7.pdf"));
        assert!(tokio::fs::metadata(&path).await.is_ok());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
