//! Circuit breaker for the fiscal-authority call path
//!
//! Closed → Open → Half-Open. A single instance is shared by the facturacion
//! workers and the retry scheduler; every state read and update happens under
//! one mutex. The open → half-open upgrade is time-based and performed on
//! `state()` reads.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use shared::{AppError, ErrorCode};

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed,
    /// Tripped - fast-fail every request
    Open,
    /// Probing - one request allowed through
    HalfOpen,
}

impl CircuitState {
    /// Name used by the health endpoint and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Tunable parameters
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker open
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close it again
    pub success_threshold: u32,
    /// How long to stay open before allowing a probe
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(60),
        }
    }
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure: Option<Instant>,
}

/// Thread-safe circuit breaker
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                last_failure: None,
            }),
        }
    }

    /// Current state, applying the timed open → half-open upgrade
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        if inner.state == CircuitState::Open {
            let elapsed = inner
                .last_failure
                .map(|t| t.elapsed() >= self.config.open_timeout)
                .unwrap_or(true);
            if elapsed {
                tracing::info!("circuit breaker open timeout elapsed, probing (half_open)");
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
            }
        }
        inner.state
    }

    /// Run `f` through the breaker.
    ///
    /// Fast-fails with `CircuitOpen` without invoking `f` when open. The
    /// mutex is never held across the await point; counters are updated
    /// after the call resolves.
    pub async fn execute<T, F, Fut, E>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if self.state() == CircuitState::Open {
            return Err(AppError::new(ErrorCode::CircuitOpen));
        }

        match f().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(AppError::with_message(
                    ErrorCode::DependencyUnavailable,
                    e.to_string(),
                ))
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    tracing::info!("circuit breaker recovered, closing");
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = inner.failure_count,
                        "failure threshold reached, opening circuit breaker"
                    );
                    inner.state = CircuitState::Open;
                    inner.success_count = 0;
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!("probe failed, reopening circuit breaker");
                inner.state = CircuitState::Open;
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_millis(30),
        }
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), AppError> {
        cb.execute(|| async { Err::<(), _>("boom") }).await.map(|_| ())
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), AppError> {
        cb.execute(|| async { Ok::<_, String>(()) }).await
    }

    #[tokio::test]
    async fn test_trips_after_consecutive_failures() {
        let cb = CircuitBreaker::new(fast_config());
        for _ in 0..5 {
            assert!(fail(&cb).await.is_err());
        }
        assert_eq!(cb.state(), CircuitState::Open);

        // Next call fast-fails with CircuitOpen, fn not invoked
        let called = std::sync::atomic::AtomicBool::new(false);
        let err = cb
            .execute(|| async {
                called.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok::<(), String>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CircuitOpen);
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_success_resets_failure_count_in_closed() {
        let cb = CircuitBreaker::new(fast_config());
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        succeed(&cb).await.unwrap();
        // Four more failures still do not trip (counter was reset)
        for _ in 0..4 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_recovery() {
        let cb = CircuitBreaker::new(fast_config());
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new(fast_config());
        for _ in 0..5 {
            let _ = fail(&cb).await;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
