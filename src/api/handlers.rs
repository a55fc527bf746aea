use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::OpenApi;

use super::{
    dto::{
        CreateReadingRequest, CreateReadingResponse, ErrorResponse, IngestErrorResponse,
        ReadingDto, StatsDto,
    },
    errors::{AppError, IngestError},
    AppState,
};
use crate::db::DEFAULT_RECENT_LIMIT;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    /// Kept as text so a malformed value falls back to the default instead
    /// of rejecting the request.
    pub limit: Option<String>,
}

/// Absent, unparsable or non-positive limits become `DEFAULT_RECENT_LIMIT`;
/// anything above `max` is clamped to `max`.
pub(crate) fn parse_limit(raw: Option<&str>, max: i64) -> i64 {
    let limit = raw
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_RECENT_LIMIT);
    limit.min(max.max(1))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Store one reading and push it to live subscribers.
#[utoipa::path(
    post,
    path = "/api/data",
    request_body = CreateReadingRequest,
    responses(
        (status = 200, description = "Reading stored", body = CreateReadingResponse),
        (status = 500, description = "Body was not a reading or the datastore rejected it", body = IngestErrorResponse),
    ),
    tag = "data"
)]
pub async fn create_reading(
    State(state): State<AppState>,
    payload: Result<Json<CreateReadingRequest>, JsonRejection>,
) -> Result<Json<CreateReadingResponse>, IngestError> {
    let Json(payload) = payload?;
    let reading = state.ingest.ingest(payload.into()).await?;

    Ok(Json(CreateReadingResponse {
        success: true,
        id: reading.id,
    }))
}

/// Fetch the most recent readings, newest first.
#[utoipa::path(
    get,
    path = "/api/data",
    params(
        ("limit" = Option<String>, Query, description = "Maximum number of readings (default 100)"),
    ),
    responses(
        (status = 200, description = "Recent readings, newest first", body = Vec<ReadingDto>),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "data"
)]
pub async fn list_recent(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<ReadingDto>>, AppError> {
    let limit = parse_limit(params.limit.as_deref(), state.recent_limit_max);
    let rows = state.store.list_recent(limit).await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Aggregate counts over every stored reading.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "Reading statistics", body = StatsDto),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "data"
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsDto>, AppError> {
    let stats = state.store.stats().await?;
    Ok(Json(stats.into()))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(create_reading, list_recent, get_stats, health),
    components(schemas(
        ReadingDto,
        CreateReadingRequest,
        CreateReadingResponse,
        StatsDto,
        ErrorResponse,
        IngestErrorResponse,
    )),
    tags(
        (name = "data",   description = "Sensor reading ingestion and queries"),
        (name = "system", description = "System endpoints"),
    ),
    info(
        title = "Sensor Feed API",
        version = "0.1.0",
        description = "Ingests sensor readings and streams them to live subscribers"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
