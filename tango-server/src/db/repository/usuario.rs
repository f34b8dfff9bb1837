//! User repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Usuario;

const USUARIO_COLS: &str =
    "id, username, nombre, password_hash, rol, punto_de_venta, activo, created_at";

/// Lookup is case-insensitive: usernames are normalized on write and the
/// query lowercases the stored value too, covering seeded rows.
pub async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<Usuario>, sqlx::Error> {
    sqlx::query_as::<_, Usuario>(&format!(
        "SELECT {USUARIO_COLS} FROM usuarios WHERE LOWER(username) = LOWER($1)"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Usuario>, sqlx::Error> {
    sqlx::query_as::<_, Usuario>(&format!(
        "SELECT {USUARIO_COLS} FROM usuarios WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    username: &str,
    nombre: &str,
    password_hash: &str,
    rol: &str,
    punto_de_venta: Option<i32>,
) -> Result<Usuario, sqlx::Error> {
    sqlx::query_as::<_, Usuario>(&format!(
        r#"
        INSERT INTO usuarios (id, username, nombre, password_hash, rol, punto_de_venta, activo, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE, now())
        RETURNING {USUARIO_COLS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(nombre)
    .bind(password_hash)
    .bind(rol)
    .bind(punto_de_venta)
    .fetch_one(pool)
    .await
}
