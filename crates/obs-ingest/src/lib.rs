//! Ingestion gateway: authenticates, validates and stores events posted by the
//! SDKs, and serves a grouped view of what was stored.

pub mod handlers;
pub mod services;

use axum::Router;
use obs_database::DbConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use handlers::{configure_routes, AppState, EventsApiDoc};
pub use services::{EventIngestionService, EventQueryService, IngestError};

/// Path the OpenAPI document is served from
pub const OPENAPI_PATH: &str = "/api/openapi.json";

impl AppState {
    pub fn new(db: Arc<DbConnection>, api_key: Option<String>) -> Self {
        Self {
            ingestion_service: Arc::new(EventIngestionService::new(db.clone())),
            query_service: Arc::new(EventQueryService::new(db)),
            api_key,
        }
    }
}

/// Full gateway router: event routes, the OpenAPI document with its Swagger UI,
/// and request tracing
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(configure_routes().with_state(state))
        .merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, EventsApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
