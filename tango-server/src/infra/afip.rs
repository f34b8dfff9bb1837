//! Fiscal-authority client (AFIP sidecar)
//!
//! Thin HTTP client for the sidecar's `/facturar` endpoint. The wire format
//! is the only place in the system where floats are allowed; everything up to
//! serialization stays in `Decimal`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Request body for `POST {sidecar}/facturar`. Field names match the
/// sidecar's schema exactly.
#[derive(Debug, Clone, Serialize)]
pub struct AfipPayload {
    /// Issuer tax id, no dashes
    pub cuit_emisor: String,
    pub punto_de_venta: i32,
    /// 1=Factura A, 6=Factura B, 11=Factura C
    pub tipo_comprobante: i32,
    /// 96=DNI, 80=CUIT, 99=Consumidor Final
    pub tipo_doc_receptor: i32,
    /// "0" for consumidor final
    pub nro_doc_receptor: String,
    /// 1=Productos, 2=Servicios, 3=Ambos
    pub concepto: i32,
    pub importe_neto: f64,
    pub importe_exento: f64,
    pub importe_iva: f64,
    pub importe_total: f64,
    pub venta_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfipObservacion {
    pub codigo: i32,
    pub mensaje: String,
}

/// Response from the sidecar after querying WSFEV1
#[derive(Debug, Clone, Deserialize)]
pub struct AfipResponse {
    pub cae: String,
    /// `YYYYMMDD`
    pub cae_vencimiento: String,
    /// "A" (aprobado) | "R" (rechazado)
    pub resultado: String,
    #[serde(default)]
    pub observaciones: Vec<AfipObservacion>,
}

impl AfipResponse {
    pub fn aprobado(&self) -> bool {
        self.resultado == "A"
    }
}

#[derive(Debug, Error)]
pub enum AfipError {
    #[error("afip: sidecar unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("afip: sidecar returned {0}")]
    Status(u16),
}

/// HTTP client that delegates fiscal communication to the sidecar. The
/// decoupling isolates authority failures from the sale path.
#[derive(Debug, Clone)]
pub struct AfipClient {
    sidecar_url: String,
    http: reqwest::Client,
}

impl AfipClient {
    pub fn new(sidecar_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            sidecar_url: sidecar_url.into(),
            http,
        }
    }

    /// POST to the sidecar and return the CAE response. Any non-200 status
    /// counts as transport failure.
    pub async fn facturar(&self, payload: &AfipPayload) -> Result<AfipResponse, AfipError> {
        let url = format!("{}/facturar", self.sidecar_url);
        let resp = self.http.post(&url).json(payload).send().await?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(AfipError::Status(resp.status().as_u16()));
        }

        Ok(resp.json::<AfipResponse>().await?)
    }
}

/// Decimal → wire float, only at this boundary
pub fn importe_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Parse the authority's `YYYYMMDD` expiry date
pub fn parse_fecha_cae(s: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_payload_wire_format() {
        let payload = AfipPayload {
            cuit_emisor: "20111111112".into(),
            punto_de_venta: 1,
            tipo_comprobante: 11,
            tipo_doc_receptor: 99,
            nro_doc_receptor: "0".into(),
            concepto: 1,
            importe_neto: 750.0,
            importe_exento: 0.0,
            importe_iva: 0.0,
            importe_total: 750.0,
            venta_id: "v-1".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["cuit_emisor"], "20111111112");
        assert_eq!(json["punto_de_venta"], 1);
        assert_eq!(json["tipo_comprobante"], 11);
        assert_eq!(json["tipo_doc_receptor"], 99);
        assert_eq!(json["nro_doc_receptor"], "0");
        assert_eq!(json["concepto"], 1);
        assert_eq!(json["importe_total"], 750.0);
        assert_eq!(json["venta_id"], "v-1");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"cae":"71234567890123","cae_vencimiento":"20260815","resultado":"A",
                      "observaciones":[{"codigo":10017,"mensaje":"obs"}]}"#;
        let resp: AfipResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.aprobado());
        assert_eq!(resp.cae, "71234567890123");
        assert_eq!(resp.observaciones.len(), 1);

        let rejected = r#"{"cae":"","cae_vencimiento":"","resultado":"R"}"#;
        let resp: AfipResponse = serde_json::from_str(rejected).unwrap();
        assert!(!resp.aprobado());
        assert!(resp.observaciones.is_empty());
    }

    #[test]
    fn test_parse_fecha_cae() {
        let fecha = parse_fecha_cae("20260815").unwrap();
        assert_eq!(fecha, chrono::NaiveDate::from_ymd_opt(2026, 8, 15).unwrap());
        assert!(parse_fecha_cae("2026-08-15").is_none());
        assert!(parse_fecha_cae("").is_none());
    }

    #[test]
    fn test_importe_to_f64() {
        assert_eq!(importe_to_f64(Decimal::from_str("750.50").unwrap()), 750.5);
    }
}
