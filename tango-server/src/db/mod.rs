//! Persistence layer
//!
//! Thin translation between domain values and Postgres rows. Repositories are
//! module-level functions taking the pool (or an open transaction for the
//! multi-row flows described in the sale commit contract).

use shared::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub mod models;
pub mod repository;

/// Sole writer of all domain state. Bounded at 25 open / 5 idle connections.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(25)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Map a driver error into the generic database AppError, logging the detail
pub fn db_err(e: sqlx::Error) -> AppError {
    tracing::error!(error = %e, "database error");
    AppError::database(e.to_string())
}
