//! Admin endpoints that drive the collection workflows.
//!
//! Every successful workflow answers `{ "status": "success", "message", ... }`
//! inside the usual envelope. Failures use the standard error body with
//! `"status": "error"` and the message added at the top level.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use travelmap_collector::{
    BatchReport, ChannelReport, CollectError, CollectionStatus, Collector, NewChannelOptions,
    TriggerSource,
};
use travelmap_core::Gender;
use travelmap_detect::DetectedCountry;

use crate::middleware::RequestId;

use super::{map_collect_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct WorkflowResult<T: Serialize> {
    status: &'static str,
    #[serde(flatten)]
    result: T,
}

impl<T: Serialize> WorkflowResult<T> {
    fn success(result: T) -> Self {
        Self {
            status: "success",
            result,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChannelQuery {
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub gender: Option<Gender>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DetectRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub(super) struct DetectionPreview {
    title: String,
    countries: Vec<DetectedCountry>,
}

type WorkflowResponse<T> = Result<Json<ApiResponse<WorkflowResult<T>>>, ApiError>;

fn collector(state: &AppState, req_id: &RequestId) -> Result<Arc<Collector>, ApiError> {
    state.collector.clone().ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "service_unavailable",
            "collection is disabled: YOUTUBE_API_KEY is not configured",
        )
        .workflow_failure()
    })
}

fn required_channel(query: &ChannelQuery, req_id: &RequestId) -> Result<String, ApiError> {
    query
        .channel_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "validation_error", "channelId is required")
                .workflow_failure()
        })
}

fn respond<T: Serialize>(
    req_id: RequestId,
    result: Result<T, CollectError>,
) -> WorkflowResponse<T> {
    match result {
        Ok(report) => Ok(ApiResponse::new(req_id.0, WorkflowResult::success(report))),
        Err(e) => Err(map_collect_error(req_id.0, &e).workflow_failure()),
    }
}

pub(super) async fn collect_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> WorkflowResponse<BatchReport> {
    let collector = collector(&state, &req_id)?;
    let result = collector.collect_all(TriggerSource::Api).await;
    respond(req_id, result)
}

pub(super) async fn update_all(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> WorkflowResponse<BatchReport> {
    let collector = collector(&state, &req_id)?;
    let result = collector.update_all(TriggerSource::Api).await;
    respond(req_id, result)
}

pub(super) async fn process_unprocessed(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> WorkflowResponse<BatchReport> {
    let collector = collector(&state, &req_id)?;
    let result = collector.process_unprocessed(TriggerSource::Api).await;
    respond(req_id, result)
}

pub(super) async fn collect_channel(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ChannelQuery>,
) -> WorkflowResponse<ChannelReport> {
    let collector = collector(&state, &req_id)?;
    let channel = required_channel(&query, &req_id)?;
    let result = collector.collect_channel(&channel).await;
    respond(req_id, result)
}

pub(super) async fn add_channel(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ChannelQuery>,
) -> WorkflowResponse<ChannelReport> {
    let collector = collector(&state, &req_id)?;
    let channel = required_channel(&query, &req_id)?;
    let options = NewChannelOptions {
        name: query.channel_name.as_deref(),
        gender: query.gender,
    };
    let result = collector.add_channel(&channel, options).await;
    respond(req_id, result)
}

pub(super) async fn collection_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CollectionStatus>>, ApiError> {
    let collector = collector(&state, &req_id)?;
    Ok(ApiResponse::new(req_id.0, collector.status()))
}

/// Runs detection on a title without touching storage.
pub(super) async fn detect_title(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<DetectRequest>,
) -> Json<ApiResponse<DetectionPreview>> {
    let countries = state.detector.detect(&body.title);
    ApiResponse::new(
        req_id.0,
        DetectionPreview {
            title: body.title,
            countries,
        },
    )
}
