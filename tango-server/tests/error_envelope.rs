//! The stable error envelope over HTTP: `{"detail": ...}` with optional
//! field-level tags, and the status-code mapping the clients depend on.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use shared::{AppError, ErrorCode};
use tower::ServiceExt;

fn test_router() -> Router {
    Router::new()
        .route(
            "/duplicate-open",
            get(|| async { Err::<(), _>(AppError::new(ErrorCode::DuplicateOpen)) }),
        )
        .route(
            "/validation",
            get(|| async {
                Err::<(), _>(
                    AppError::validation("cantidad debe ser al menos 1")
                        .with_field("cantidad", "min"),
                )
            }),
        )
        .route(
            "/db",
            get(|| async { Err::<(), _>(AppError::database("connection refused 10.0.0.5")) }),
        )
        .route(
            "/circuit",
            get(|| async { Err::<(), _>(AppError::new(ErrorCode::CircuitOpen)) }),
        )
}

async fn get_json(router: Router, path: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn duplicate_open_maps_to_409() {
    let (status, body) = get_json(test_router(), "/duplicate-open").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["detail"],
        "An open cash session already exists for this register"
    );
    assert!(body.get("fields").is_none());
}

#[tokio::test]
async fn validation_maps_to_422_with_fields() {
    let (status, body) = get_json(test_router(), "/validation").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "cantidad debe ser al menos 1");
    assert_eq!(body["fields"]["cantidad"], "min");
}

#[tokio::test]
async fn database_errors_are_generic_500() {
    let (status, body) = get_json(test_router(), "/db").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    // Internals never leak to the client
    assert_eq!(body["detail"], "Database error");
}

#[tokio::test]
async fn circuit_open_maps_to_503() {
    let (status, body) = get_json(test_router(), "/circuit").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Circuit breaker is open");
}
