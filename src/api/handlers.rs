use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, error};
use utoipa::OpenApi;

use super::{
    dto::{HistoryByDateParams, IngestRequest, IngestResponse, ReadingDto},
    errors::AppError,
};
use crate::{control::Command, db::HISTORY_LIMIT, sensors::SensorService};

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Plain-text liveness banner.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Server is online", body = String, content_type = "text/plain"),
    ),
    tag = "system"
)]
pub async fn home() -> &'static str {
    "Plant server is online"
}

/// Store one reading from the device and answer with the watering command.
///
/// The response is `success` even when the reading could not be stored; the
/// command never depends on persistence.
#[utoipa::path(
    post,
    path = "/api/data",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Reading accepted", body = IngestResponse),
        (status = 400, description = "Body is not a JSON object of readings"),
    ),
    tag = "readings"
)]
pub async fn ingest_reading(
    State(service): State<SensorService>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let request = parse_ingest_body(&body)?;
    let outcome = service.ingest(request.into()).await;

    match &outcome.persisted {
        Ok(id) => debug!(id = *id, "Reading stored"),
        Err(e) => error!(error = %e, "Failed to store reading; it has been dropped"),
    }

    Ok(Json(IngestResponse::success(outcome.command)))
}

/// An empty body (or JSON `null`) means no fields were sent.
fn parse_ingest_body(body: &[u8]) -> Result<IngestRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(IngestRequest::default());
    }
    let parsed: Option<IngestRequest> =
        serde_json::from_slice(body).map_err(AppError::bad_request)?;
    Ok(parsed.unwrap_or_default())
}

/// Fetch the most recent reading, or `{}` when nothing has been stored yet.
#[utoipa::path(
    get,
    path = "/api/latest",
    responses(
        (status = 200, description = "Latest reading, or an empty object", body = ReadingDto),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn get_latest(State(service): State<SensorService>) -> Result<Json<Value>, AppError> {
    let body = match service.store().latest().await? {
        Some(reading) => serde_json::to_value(ReadingDto::from(reading))?,
        None => json!({}),
    };
    Ok(Json(body))
}

/// Fetch up to 50 readings, most recent first.
#[utoipa::path(
    get,
    path = "/api/history",
    responses(
        (status = 200, description = "Recent readings, newest first", body = Vec<ReadingDto>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn get_history(
    State(service): State<SensorService>,
) -> Result<Json<Vec<ReadingDto>>, AppError> {
    let rows = service.store().recent(HISTORY_LIMIT).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// List the distinct days that have readings, newest first.
#[utoipa::path(
    get,
    path = "/api/dates",
    responses(
        (status = 200, description = "Days as YYYY-MM-DD, newest first", body = Vec<String>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn get_dates(State(service): State<SensorService>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(service.store().dates().await?))
}

/// Fetch every reading of one day (or of all time), oldest first.
#[utoipa::path(
    get,
    path = "/api/history_by_date",
    params(HistoryByDateParams),
    responses(
        (status = 200, description = "Readings of the selected day, oldest first", body = Vec<ReadingDto>),
        (status = 400, description = "date is neither YYYY-MM-DD nor \"All Time\""),
        (status = 500, description = "Internal server error"),
    ),
    tag = "readings"
)]
pub async fn get_history_by_date(
    State(service): State<SensorService>,
    Query(params): Query<HistoryByDateParams>,
) -> Result<Json<Vec<ReadingDto>>, AppError> {
    let day = params.day().map_err(AppError::bad_request)?;
    let rows = service.store().on_date(day).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(home, ingest_reading, get_latest, get_history, get_dates, get_history_by_date),
    components(schemas(IngestRequest, IngestResponse, ReadingDto, Command)),
    tags(
        (name = "readings", description = "Telemetry ingestion and query endpoints"),
        (name = "system",   description = "System endpoints"),
    ),
    info(
        title = "Plant Telemetry API",
        version = "0.1.0",
        description = "Soil and climate telemetry ingestion with watering decisions"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
