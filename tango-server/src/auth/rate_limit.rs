//! Application-layer rate limiting
//!
//! Per-client-IP sliding windows kept in a route → (IP → entry) map. A
//! periodic sweep purges entries whose window has elapsed. 429 responses
//! carry a `Retry-After` header.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use shared::{AppError, ErrorCode};
use std::sync::Arc;
use tokio::time::Instant;

const WINDOW_SECS: u64 = 60;
const LOGIN_MAX_PER_MIN: u32 = 20;
const GLOBAL_MAX_PER_MIN: u32 = 1000;

struct IpEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    /// route name -> (IP -> entry)
    inner: Arc<DashMap<&'static str, DashMap<String, IpEntry>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited
    fn check(&self, route: &'static str, ip: &str, max_requests: u32, window_secs: u64) -> bool {
        let route_map = self.inner.entry(route).or_default();
        let now = Instant::now();

        let mut entry = route_map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start).as_secs() >= window_secs {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= max_requests
    }

    /// Remove entries older than 5 minutes
    pub fn cleanup(&self) {
        let cutoff = std::time::Duration::from_secs(300);
        let now = Instant::now();

        for route_map in self.inner.iter() {
            route_map.retain(|_, entry| now.duration_since(entry.window_start) < cutoff);
        }

        self.inner.retain(|_, route_map| !route_map.is_empty());
    }
}

/// Client IP: X-Real-IP first (set by the reverse proxy), then the last
/// X-Forwarded-For entry, then the peer address.
fn extract_ip(request: &Request) -> String {
    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(val) = forwarded.to_str() {
            if let Some(last) = val.rsplit(',').next() {
                let ip = last.trim();
                if !ip.is_empty() {
                    return ip.to_owned();
                }
            }
        }
    }

    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

fn too_many_requests() -> Response {
    let mut response = AppError::new(ErrorCode::TooManyRequests).into_response();
    response
        .headers_mut()
        .insert(http::header::RETRY_AFTER, http::HeaderValue::from_static("60"));
    response
}

/// Rate limit middleware for login: 20 requests/minute per IP
pub async fn login_rate_limit(
    State(state): State<crate::state::AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(&request);
    if !state
        .rate_limiter
        .check("login", &ip, LOGIN_MAX_PER_MIN, WINDOW_SECS)
    {
        return Err(too_many_requests());
    }
    Ok(next.run(request).await)
}

/// Global rate limit middleware: 1000 requests/minute per IP
pub async fn global_rate_limit(
    State(state): State<crate::state::AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(&request);
    if !state
        .rate_limiter
        .check("global", &ip, GLOBAL_MAX_PER_MIN, WINDOW_SECS)
    {
        return Err(too_many_requests());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_allows_up_to_max() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check("login", "10.0.0.1", 5, 60));
        }
        assert!(!limiter.check("login", "10.0.0.1", 5, 60));
        // A different IP has its own budget
        assert!(limiter.check("login", "10.0.0.2", 5, 60));
    }

    #[test]
    fn test_routes_are_independent() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("login", "10.0.0.1", 1, 60));
        assert!(!limiter.check("login", "10.0.0.1", 1, 60));
        assert!(limiter.check("global", "10.0.0.1", 1, 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reset() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("login", "10.0.0.1", 1, 1));
        assert!(!limiter.check("login", "10.0.0.1", 1, 1));

        tokio::time::advance(std::time::Duration::from_secs(2)).await;
        assert!(limiter.check("login", "10.0.0.1", 1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_purges_stale_windows() {
        let limiter = RateLimiter::new();
        limiter.check("login", "10.0.0.1", 5, 60);
        tokio::time::advance(std::time::Duration::from_secs(301)).await;
        limiter.cleanup();
        assert!(limiter.inner.is_empty());
    }
}
