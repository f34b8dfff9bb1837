//! Application state
//!
//! The process-wide mutables (circuit breaker, rate-limiter maps, connection
//! pool) all live here; nothing is an ambient global. Cloning is cheap -
//! everything heavy is behind an `Arc` or pooled.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::rate_limit::RateLimiter;
use crate::auth::TokenService;
use crate::config::Config;
use crate::db;
use crate::infra::afip::AfipClient;
use crate::infra::broker::Broker;
use crate::infra::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::infra::mailer::Mailer;
use crate::workers::dispatcher::Dispatcher;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// PostgreSQL pool - sole writer of all domain state
    pub pool: PgPool,
    /// Redis broker behind the job queues
    pub broker: Broker,
    pub dispatcher: Dispatcher,
    /// Fiscal-authority client
    pub afip: AfipClient,
    /// Single breaker instance shared by workers and the retry scheduler
    pub breaker: Arc<CircuitBreaker>,
    pub rate_limiter: RateLimiter,
    pub tokens: TokenService,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = db::connect(&config.database_url).await?;
        sqlx::migrate!("../migrations").run(&pool).await?;
        tracing::info!("connected to PostgreSQL, schema up to date");

        let broker = Broker::connect(&config.redis_url).await?;
        tracing::info!("connected to Redis broker");

        let tokens = TokenService::new(
            config.jwt_secret.clone(),
            config.jwt_access_hours,
            config.jwt_refresh_hours,
        );
        let afip = AfipClient::new(config.afip_sidecar_url.clone());
        let mailer = Mailer::new(
            &config.smtp_host,
            config.smtp_port,
            &config.smtp_user,
            &config.smtp_password,
            &config.host_domain,
        );

        Ok(Self {
            dispatcher: Dispatcher::new(broker.clone()),
            broker,
            pool,
            afip,
            breaker: Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())),
            rate_limiter: RateLimiter::new(),
            tokens,
            mailer: Arc::new(mailer),
            config: Arc::new(config),
        })
    }
}
