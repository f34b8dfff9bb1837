//! Authentication service - login and token refresh

use serde::{Deserialize, Serialize};
use shared::util::normalize_username;
use shared::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use crate::db::db_err;
use crate::db::repository::usuario;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub usuario: UsuarioInfo,
}

#[derive(Debug, Serialize)]
pub struct UsuarioInfo {
    pub id: Uuid,
    pub username: String,
    pub nombre: String,
    pub rol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punto_de_venta: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<LoginResponse> {
    let username = normalize_username(&req.username);

    let user = usuario::find_by_username(&state.pool, &username)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::new(ErrorCode::InvalidCredentials));
    }
    if !user.activo {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let access_token =
        state
            .tokens
            .mint_access(user.id, &user.username, &user.rol, user.punto_de_venta)?;
    let refresh_token =
        state
            .tokens
            .mint_refresh(user.id, &user.username, &user.rol, user.punto_de_venta)?;

    tracing::info!(usuario = %user.username, "login");

    Ok(LoginResponse {
        access_token,
        refresh_token,
        usuario: UsuarioInfo {
            id: user.id,
            username: user.username,
            nombre: user.nombre,
            rol: user.rol,
            punto_de_venta: user.punto_de_venta,
        },
    })
}

/// Exchange a valid refresh token for a fresh access token. The user is
/// re-read so role changes and deactivations take effect immediately.
pub async fn refresh(state: &AppState, req: RefreshRequest) -> AppResult<RefreshResponse> {
    let claims = state.tokens.verify_refresh(&req.refresh_token)?;

    let user = usuario::find_by_id(&state.pool, claims.sub)
        .await
        .map_err(db_err)?
        .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid))?;
    if !user.activo {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let access_token =
        state
            .tokens
            .mint_access(user.id, &user.username, &user.rol, user.punto_de_venta)?;
    Ok(RefreshResponse { access_token })
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secreto123").unwrap();
        assert!(verify_password("secreto123", &hash));
        assert!(!verify_password("secreto124", &hash));
        assert!(!verify_password("secreto123", "not-a-phc-string"));
    }
}
