mod admin;
mod collection_runs;
mod filters;
mod map;
mod videos;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use travelmap_collector::{CollectError, Collector, GatewayError};
use travelmap_detect::CountryDetector;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub detector: Arc<CountryDetector>,
    /// `None` when no `YouTube` API key is configured; admin workflows then
    /// answer 503.
    pub collector: Option<Arc<Collector>>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    /// `"error"` on admin workflow failures, absent elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    collector: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: None,
            message: None,
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    /// Tags the body as a failed admin workflow: `status: "error"` and the
    /// message at the top level, beside the usual error object.
    #[must_use]
    pub fn workflow_failure(mut self) -> Self {
        self.status = Some("error");
        self.message = Some(self.error.message.clone());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &travelmap_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_collect_error(request_id: String, error: &CollectError) -> ApiError {
    match error {
        CollectError::AlreadyRunning | CollectError::AlreadyRegistered { .. } => {
            tracing::info!(error = %error, "collection request rejected");
            ApiError::new(request_id, "conflict", error.to_string())
        }
        CollectError::NotFound(_) => ApiError::new(request_id, "not_found", error.to_string()),
        CollectError::Gateway(GatewayError::QuotaExceeded(_) | GatewayError::Upstream(_)) => {
            tracing::error!(error = %error, "upstream video platform failed");
            ApiError::new(request_id, "upstream_error", error.to_string())
        }
        CollectError::Gateway(GatewayError::NotFound(what)) => {
            ApiError::new(request_id, "not_found", format!("not found: {what}"))
        }
        CollectError::Store(e) => {
            tracing::error!(error = %e, "collection storage failed");
            ApiError::new(request_id, "internal_error", "collection storage failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/filters", get(filters::get_filters))
        .route("/api/v1/map-data", get(map::get_map_data))
        .route("/api/v1/videos", get(videos::list_videos))
        .route("/api/v1/videos/{id}", get(videos::get_video))
        .route(
            "/api/v1/countries/{code}/videos",
            get(videos::list_country_videos),
        )
        .route(
            "/api/v1/collection-runs",
            get(collection_runs::list_collection_runs),
        )
        .route("/api/v1/admin/collect-all", post(admin::collect_all))
        .route("/api/v1/admin/collect-channel", post(admin::collect_channel))
        .route("/api/v1/admin/update-all", post(admin::update_all))
        .route(
            "/api/v1/admin/process-unprocessed",
            post(admin::process_unprocessed),
        )
        .route(
            "/api/v1/admin/collection-status",
            get(admin::collection_status),
        )
        .route("/api/v1/admin/add-channel", post(admin::add_channel))
        .route("/api/v1/admin/detect", post(admin::detect_title))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let collector = if state.collector.is_some() {
        "enabled"
    } else {
        "disabled"
    };

    match travelmap_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    database: "ok",
                    collector,
                },
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::new(
                    req_id.0,
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                        collector,
                    },
                ),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
