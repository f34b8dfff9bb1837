//! User rows

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Backend user. `username` is unique case-insensitively.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Usuario {
    pub id: Uuid,
    pub username: String,
    pub nombre: String,
    pub password_hash: String,
    /// cajero | supervisor | administrador
    pub rol: String,
    /// Register this cashier is bound to, when any
    pub punto_de_venta: Option<i32>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
}
