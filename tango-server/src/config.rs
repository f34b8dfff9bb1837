//! Server configuration
//!
//! Everything comes from environment variables; `.env` is loaded by `main`
//! before this runs. Only `DATABASE_URL`, `REDIS_URL` and `JWT_SECRET` are
//! mandatory.

use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port
    pub port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Redis broker URL
    pub redis_url: String,
    /// HMAC secret for access/refresh tokens
    pub jwt_secret: String,
    /// Access-token lifetime in hours
    pub jwt_access_hours: i64,
    /// Refresh-token lifetime in hours
    pub jwt_refresh_hours: i64,
    /// Base URL of the AFIP sidecar (`{url}/facturar`)
    pub afip_sidecar_url: String,
    /// Issuer tax id sent on every authorization request
    pub cuit_emisor: String,
    /// Fiscal register number reported to the authority
    pub punto_venta_fiscal: i32,
    /// Worker pool size for the facturacion queue
    pub workers_facturacion: usize,
    /// Worker pool size for the email queue
    pub workers_email: usize,
    /// SMTP relay host (empty disables delivery)
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    /// Root directory for generated ticket documents
    pub pdf_storage_path: String,
    /// Public host name, used in email bodies
    pub host_domain: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env_or("PORT", 8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL must be set"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_access_hours: env_or("JWT_ACCESS_HOURS", 8),
            jwt_refresh_hours: env_or("JWT_REFRESH_HOURS", 24),
            afip_sidecar_url: std::env::var("AFIP_SIDECAR_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8090".into()),
            cuit_emisor: std::env::var("CUIT_EMISOR").unwrap_or_else(|_| "20111111112".into()),
            punto_venta_fiscal: env_or("PUNTO_VENTA_FISCAL", 1),
            workers_facturacion: env_or("WORKERS_FACTURACION", 2),
            workers_email: env_or("WORKERS_EMAIL", 1),
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env_or("SMTP_PORT", 587),
            smtp_user: std::env::var("SMTP_USER").unwrap_or_default(),
            smtp_password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            pdf_storage_path: std::env::var("PDF_STORAGE_PATH")
                .unwrap_or_else(|_| "storage/tickets".into()),
            host_domain: std::env::var("HOST_DOMAIN").unwrap_or_else(|_| "localhost".into()),
        }
    }

    /// Access-token lifetime
    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_access_hours as u64 * 3600)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
