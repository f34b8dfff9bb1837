//! Token service
//!
//! Access and refresh tokens are HMAC-SHA256 envelopes over the user
//! identity, role and bound register. Access tokens default to 8 hours,
//! refresh tokens to 24; both are configurable.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{AppError, ErrorCode};
use uuid::Uuid;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Claims carried by every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub username: String,
    /// cajero | supervisor | administrador
    pub rol: String,
    /// Register this cashier is bound to, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punto_de_venta: Option<i32>,
    /// access | refresh
    pub token_type: String,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
}

#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_hours: i64,
    refresh_hours: i64,
}

impl TokenService {
    pub fn new(secret: impl Into<String>, access_hours: i64, refresh_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            access_hours,
            refresh_hours,
        }
    }

    pub fn mint_access(
        &self,
        user_id: Uuid,
        username: &str,
        rol: &str,
        punto_de_venta: Option<i32>,
    ) -> Result<String, AppError> {
        self.mint(user_id, username, rol, punto_de_venta, TOKEN_TYPE_ACCESS, self.access_hours)
    }

    pub fn mint_refresh(
        &self,
        user_id: Uuid,
        username: &str,
        rol: &str,
        punto_de_venta: Option<i32>,
    ) -> Result<String, AppError> {
        self.mint(user_id, username, rol, punto_de_venta, TOKEN_TYPE_REFRESH, self.refresh_hours)
    }

    fn mint(
        &self,
        user_id: Uuid,
        username: &str,
        rol: &str,
        punto_de_venta: Option<i32>,
        token_type: &str,
        hours: i64,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            rol: rol.to_string(),
            punto_de_venta,
            token_type: token_type.to_string(),
            exp: (now + Duration::hours(hours)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("token generation failed: {e}")))
    }

    /// Verify the signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired),
            _ => AppError::new(ErrorCode::TokenInvalid),
        })
    }

    /// Verify a refresh token specifically
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.verify(token)?;
        if claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(AppError::new(ErrorCode::TokenInvalid));
        }
        Ok(claims)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn extract_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret-at-least-32-bytes-long!!", 8, 24)
    }

    #[test]
    fn test_mint_and_verify_roundtrip() {
        let svc = service();
        let id = Uuid::new_v4();
        let token = svc.mint_access(id, "carla", "cajero", Some(2)).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "carla");
        assert_eq!(claims.rol, "cajero");
        assert_eq!(claims.punto_de_venta, Some(2));
        assert_eq!(claims.token_type, TOKEN_TYPE_ACCESS);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service()
            .mint_access(Uuid::new_v4(), "carla", "cajero", None)
            .unwrap();
        let other = TokenService::new("another-secret-that-does-not-match!!!", 8, 24);
        let err = other.verify(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = TokenService::new("test-secret-at-least-32-bytes-long!!", -1, -1);
        let token = svc
            .mint_access(Uuid::new_v4(), "carla", "cajero", None)
            .unwrap();
        let err = service().verify(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn test_refresh_type_enforced() {
        let svc = service();
        let access = svc
            .mint_access(Uuid::new_v4(), "carla", "cajero", None)
            .unwrap();
        assert!(svc.verify_refresh(&access).is_err());

        let refresh = svc
            .mint_refresh(Uuid::new_v4(), "carla", "cajero", None)
            .unwrap();
        assert!(svc.verify_refresh(&refresh).is_ok());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("bearer x"), Some("x"));
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer("Bearer "), None);
    }
}
