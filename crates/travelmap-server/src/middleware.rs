//! Request-scoped middleware for the travelmap API.
//!
//! Every route gets an `x-request-id`. Everything except `/api/v1/health`
//! shares one fixed window, so the admin workflow triggers and the read
//! endpoints draw from the same budget (120 requests a minute by default).

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID carried as a request extension into handlers and error bodies.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: usize,
}

impl Window {
    /// Counts one request; on rejection returns how long until the window
    /// resets.
    fn admit(&mut self, max_requests: usize, length: Duration) -> Result<(), Duration> {
        let elapsed = self.started_at.elapsed();
        if elapsed >= length {
            self.started_at = Instant::now();
            self.count = 0;
        } else if self.count >= max_requests {
            return Err(length - elapsed);
        }
        self.count += 1;
        Ok(())
    }
}

/// Fixed-window limiter shared by every rate-limited route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    current: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            current: Arc::new(Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

/// Uses the caller's `x-request-id` or generates a `UUIDv4`, stores it as a
/// [`RequestId`] extension and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

/// Answers 429 in the standard error envelope, with `Retry-After` in whole
/// seconds, once the current window is spent.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let admitted = rate_limit
        .current
        .lock()
        .await
        .admit(rate_limit.max_requests, rate_limit.window);

    if let Err(wait) = admitted {
        let req_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();
        tracing::warn!(
            limit = rate_limit.max_requests,
            path = %req.uri().path(),
            request_id = %req_id,
            "rate limit exceeded"
        );
        let retry_after = wait.as_secs().max(1);
        let mut res = ApiError::new(
            req_id,
            "rate_limited",
            format!("rate limit exceeded; retry in {retry_after}s"),
        )
        .into_response();
        res.headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return res;
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use super::*;

    fn limited_router(max: usize) -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(max, Duration::from_secs(60)),
                enforce_rate_limit,
            ))
            .layer(axum::middleware::from_fn(request_id))
    }

    fn ping() -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri("/ping")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn requests_past_the_limit_are_rejected() {
        let app = limited_router(2);

        for _ in 0..2 {
            let res = app.clone().oneshot(ping()).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = app.oneshot(ping()).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn rejection_uses_error_envelope_with_retry_after() {
        let app = limited_router(1);
        app.clone().oneshot(ping()).await.unwrap();

        let res = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .header(REQUEST_ID_HEADER, "req-busy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry: u64 = res.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=60).contains(&retry));
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(json["meta"]["request_id"], "req-busy");
    }

    #[test]
    fn window_resets_after_its_length() {
        let mut window = Window {
            started_at: Instant::now(),
            count: 0,
        };
        let length = Duration::from_secs(60);
        assert!(window.admit(1, length).is_ok());
        assert!(window.admit(1, length).is_err());

        window.started_at = Instant::now().checked_sub(Duration::from_secs(61)).unwrap();
        assert!(window.admit(1, length).is_ok());
        assert_eq!(window.count, 1);
    }

    #[tokio::test]
    async fn incoming_request_id_is_echoed() {
        let res = limited_router(10)
            .oneshot(
                HttpRequest::builder()
                    .uri("/ping")
                    .header(REQUEST_ID_HEADER, "req-abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.headers()[REQUEST_ID_HEADER], "req-abc");
    }

    #[tokio::test]
    async fn missing_request_id_is_generated() {
        let res = limited_router(10).oneshot(ping()).await.unwrap();
        let id = res.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
