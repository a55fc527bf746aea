pub mod dto;
pub mod errors;
pub mod handlers;
pub mod live;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{broadcaster::Broadcaster, db::Store, ingest::IngestService};
use handlers::ApiDoc;

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Store,
    pub broadcaster: Broadcaster,
    pub ingest: IngestService,
    pub recent_limit_max: i64,
}

impl AppState {
    pub fn new(store: Store, broadcaster: Broadcaster, recent_limit_max: i64) -> Self {
        Self {
            ingest: IngestService::new(store.clone(), broadcaster.clone()),
            store,
            broadcaster,
            recent_limit_max,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/api/data",
            post(handlers::create_reading).get(handlers::list_recent),
        )
        .route("/api/stats", get(handlers::get_stats))
        .route("/ws", get(live::subscribe))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
}
