//! Cross-aggregate domain enums
//!
//! Stored as text in Postgres; row structs carry the raw string and convert
//! through `from_db` at the service boundary.

use serde::{Deserialize, Serialize};

/// User role - drives the per-endpoint role gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rol {
    Cajero,
    Supervisor,
    Administrador,
}

impl Rol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rol::Cajero => "cajero",
            Rol::Supervisor => "supervisor",
            Rol::Administrador => "administrador",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "cajero" => Some(Rol::Cajero),
            "supervisor" => Some(Rol::Supervisor),
            "administrador" => Some(Rol::Administrador),
            _ => None,
        }
    }
}

/// Payment method for sale payments and cash movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetodoPago {
    Efectivo,
    Debito,
    Credito,
    Transferencia,
    Qr,
}

impl MetodoPago {
    pub const ALL: [MetodoPago; 5] = [
        MetodoPago::Efectivo,
        MetodoPago::Debito,
        MetodoPago::Credito,
        MetodoPago::Transferencia,
        MetodoPago::Qr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetodoPago::Efectivo => "efectivo",
            MetodoPago::Debito => "debito",
            MetodoPago::Credito => "credito",
            MetodoPago::Transferencia => "transferencia",
            MetodoPago::Qr => "qr",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "efectivo" => Some(MetodoPago::Efectivo),
            "debito" => Some(MetodoPago::Debito),
            "credito" => Some(MetodoPago::Credito),
            "transferencia" => Some(MetodoPago::Transferencia),
            "qr" => Some(MetodoPago::Qr),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metodo_pago_roundtrip() {
        for m in MetodoPago::ALL {
            assert_eq!(MetodoPago::from_db(m.as_str()), Some(m));
        }
        assert_eq!(MetodoPago::from_db("cheque"), None);
    }

    #[test]
    fn test_metodo_pago_serde_names() {
        assert_eq!(serde_json::to_string(&MetodoPago::Qr).unwrap(), "\"qr\"");
        assert_eq!(
            serde_json::from_str::<MetodoPago>("\"efectivo\"").unwrap(),
            MetodoPago::Efectivo
        );
    }

    #[test]
    fn test_rol_roundtrip() {
        for r in [Rol::Cajero, Rol::Supervisor, Rol::Administrador] {
            assert_eq!(Rol::from_db(r.as_str()), Some(r));
        }
    }
}
