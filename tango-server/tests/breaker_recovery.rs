//! End-to-end circuit breaker behavior: trip on consecutive failures,
//! fast-fail while open, probe after the timeout, close after two successes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use shared::ErrorCode;
use tango_server::infra::circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState,
};

fn breaker(open_timeout_ms: u64) -> CircuitBreaker {
    CircuitBreaker::new(CircuitBreakerConfig {
        failure_threshold: 5,
        success_threshold: 2,
        open_timeout: Duration::from_millis(open_timeout_ms),
    })
}

#[tokio::test]
async fn breaker_full_recovery_cycle() {
    let cb = breaker(50);
    let calls = AtomicU32::new(0);

    // Five consecutive failures trip the breaker
    for _ in 0..5 {
        let result = cb
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("sidecar unreachable")
            })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(cb.state(), CircuitState::Open);
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    // While open, calls fast-fail without reaching the sidecar
    let err = cb
        .execute(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CircuitOpen);
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    // After the open timeout the breaker probes
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    // One success keeps probing, the second closes
    cb.execute(|| async { Ok::<(), String>(()) }).await.unwrap();
    assert_eq!(cb.state(), CircuitState::HalfOpen);
    cb.execute(|| async { Ok::<(), String>(()) }).await.unwrap();
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test]
async fn breaker_reopens_on_probe_failure_and_reprobes() {
    let cb = breaker(40);

    for _ in 0..5 {
        let _ = cb.execute(|| async { Err::<(), _>("down") }).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    // Failed probe goes straight back to open
    let _ = cb.execute(|| async { Err::<(), _>("still down") }).await;
    assert_eq!(cb.state(), CircuitState::Open);

    // The open timeout restarts from the failed probe
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cb.state(), CircuitState::HalfOpen);
}
