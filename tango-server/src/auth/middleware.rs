//! Authentication middleware and the authenticated-user extractor

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use shared::{AppError, ErrorCode};
use uuid::Uuid;

use super::token::{extract_bearer, TOKEN_TYPE_ACCESS};
use crate::db::models::Rol;
use crate::state::AppState;

/// Authenticated caller, injected into request extensions by [`require_auth`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub rol: Rol,
    pub punto_de_venta: Option<i32>,
}

impl CurrentUser {
    /// Per-endpoint role gate: 403 when the caller's role is not in the set
    pub fn require_rol(&self, permitidos: &[Rol]) -> Result<(), AppError> {
        if permitidos.contains(&self.rol) {
            Ok(())
        } else {
            Err(AppError::forbidden("Permisos insuficientes"))
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(AppError::unauthorized)
    }
}

fn is_public_path(path: &str) -> bool {
    path == "/health"
        || path == "/v1/auth/login"
        || path == "/v1/auth/refresh"
        || path.starts_with("/v1/precio/")
}

/// Bearer-token authentication for everything except the public paths
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS || is_public_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer)
        .ok_or_else(AppError::unauthorized)?;

    let claims = state.tokens.verify(token)?;
    if claims.token_type != TOKEN_TYPE_ACCESS {
        return Err(AppError::new(ErrorCode::TokenInvalid));
    }
    let rol = Rol::from_db(&claims.rol).ok_or_else(|| AppError::new(ErrorCode::TokenInvalid))?;

    req.extensions_mut().insert(CurrentUser {
        id: claims.sub,
        username: claims.username,
        rol,
        punto_de_venta: claims.punto_de_venta,
    });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert!(is_public_path("/health"));
        assert!(is_public_path("/v1/auth/login"));
        assert!(is_public_path("/v1/auth/refresh"));
        assert!(is_public_path("/v1/precio/7790001000001"));
        assert!(!is_public_path("/v1/ventas"));
        assert!(!is_public_path("/v1/caja/abrir"));
    }

    #[test]
    fn test_role_gate() {
        let user = CurrentUser {
            id: Uuid::new_v4(),
            username: "carla".into(),
            rol: Rol::Cajero,
            punto_de_venta: Some(1),
        };
        assert!(user.require_rol(&[Rol::Cajero, Rol::Supervisor]).is_ok());
        let err = user.require_rol(&[Rol::Administrador]).unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }
}
