use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::AppState;
use crate::metrics::RateLimitMetrics;
use crate::ratelimit::RateLimitResult;

/// Identify the caller: API key header, then forwarded address, then peer address
fn client_key(req: &Request<Body>) -> String {
    let headers = req.headers();

    if let Some(key) = headers.get("X-API-Key").and_then(|v| v.to_str().ok()) {
        return format!("key:{}", key);
    }

    // Deployed behind a single load balancer hop
    if let Some(ip) = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return format!("ip:{}", ip);
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware for HTTP API requests.
///
/// Returns 429 Too Many Requests with Retry-After header when rate limited.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // Skip if rate limiting is disabled
    if !state.rate_limiter.is_enabled() {
        return next.run(req).await;
    }

    let key = client_key(&req);
    let result = state.rate_limiter.check_key(&key);

    match result {
        RateLimitResult::Allowed {
            remaining,
            limit,
            reset_at,
        } => {
            RateLimitMetrics::record_allowed();
            let mut response = next.run(req).await;

            // Add rate limit headers to response
            let headers = response.headers_mut();
            if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert("X-RateLimit-Limit", v);
            }
            if let Ok(v) = HeaderValue::from_str(&remaining.to_string()) {
                headers.insert("X-RateLimit-Remaining", v);
            }
            if let Ok(v) = HeaderValue::from_str(&reset_at.to_string()) {
                headers.insert("X-RateLimit-Reset", v);
            }

            response
        }
        RateLimitResult::Denied {
            retry_after,
            limit,
            reset_at,
        } => {
            RateLimitMetrics::record_denied();
            tracing::warn!(
                client = %key,
                path = %req.uri().path(),
                retry_after = retry_after,
                "Rate limit exceeded"
            );

            rate_limit_response(retry_after, limit, reset_at)
        }
    }
}

/// Build a rate limit error response with proper headers
fn rate_limit_response(retry_after: u64, limit: u32, reset_at: i64) -> Response {
    let body = json!({
        "error": {
            "code": "RATE_LIMITED",
            "message": "Too many requests, please try again later"
        }
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
        headers.insert("Retry-After", v);
    }
    if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("X-RateLimit-Limit", v);
    }
    headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
    if let Ok(v) = HeaderValue::from_str(&reset_at.to_string()) {
        headers.insert("X-RateLimit-Reset", v);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/api/notifications/send")
    }

    #[test]
    fn test_client_key_prefers_api_key() {
        let req = request()
            .header("X-API-Key", "svc-a")
            .header("X-Forwarded-For", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&req), "key:svc-a");
    }

    #[test]
    fn test_client_key_forwarded_for() {
        let req = request()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&req), "ip:203.0.113.9");
    }

    #[test]
    fn test_client_key_peer_address() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut().insert(ConnectInfo(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 7)),
            5000,
        )));
        assert_eq!(client_key(&req), "ip:192.168.1.7");

        let req = request().body(Body::empty()).unwrap();
        assert_eq!(client_key(&req), "unknown");
    }

    #[test]
    fn test_rate_limit_response_headers() {
        let response = rate_limit_response(9, 100, 1_700_000_000);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "9");
        assert_eq!(response.headers()["X-RateLimit-Remaining"], "0");
    }
}
