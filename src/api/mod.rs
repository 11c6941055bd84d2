pub mod dto;
pub mod errors;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::sensors::SensorService;
use handlers::ApiDoc;

pub fn router(service: SensorService) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route("/", get(handlers::home))
        .route("/api/data", post(handlers::ingest_reading))
        .route("/api/latest", get(handlers::get_latest))
        .route("/api/history", get(handlers::get_history))
        .route("/api/dates", get(handlers::get_dates))
        .route("/api/history_by_date", get(handlers::get_history_by_date))
        .with_state(service)
        .split_for_parts();

    router.route(
        "/api-docs/openapi.json",
        get(move || async move { axum::Json(api) }),
    )
}
