use super::types::{
    AppState, ErrorResponse, EventGroupResponse, EventResponse, IngestResponse, ListEventsQuery,
};
use crate::services::{IngestError, MAX_GROUP_LIMIT};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use obs_core::API_KEY_HEADER;
use std::sync::Arc;
use tracing::{debug, error, warn};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(ingest_event, list_events, get_event),
    components(schemas(
        IngestResponse,
        ErrorResponse,
        EventGroupResponse,
        EventResponse,
        ListEventsQuery,
        obs_core::Event,
        obs_core::Frame,
        obs_core::Level,
    )),
    tags(
        (name = "events", description = "Event ingestion and retrieval")
    )
)]
pub struct EventsApiDoc;

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/events", post(ingest_event).get(list_events))
        .route("/api/events/{id}", get(get_event))
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = match &self {
            IngestError::MissingApiKeyConfig => StatusCode::INTERNAL_SERVER_ERROR,
            IngestError::Unauthorized => StatusCode::UNAUTHORIZED,
            IngestError::InvalidJson | IngestError::MissingMessage => StatusCode::BAD_REQUEST,
            IngestError::DuplicateEvent => StatusCode::CONFLICT,
            IngestError::EventNotFound => StatusCode::NOT_FOUND,
            IngestError::Storage(_) | IngestError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Database details stay in the logs
        let message = match &self {
            IngestError::Storage(_) => "Failed to store event".to_string(),
            IngestError::Database(e) => {
                error!("Database error: {}", e);
                "Database error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(), IngestError> {
    let expected = state
        .api_key
        .as_deref()
        .ok_or(IngestError::MissingApiKeyConfig)?;

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(expected) {
        return Err(IngestError::Unauthorized);
    }
    Ok(())
}

/// Ingest a single event
#[utoipa::path(
    post,
    path = "/api/events",
    request_body = obs_core::Event,
    params(
        ("X-OBS-Key" = String, Header, description = "Shared API key")
    ),
    responses(
        (status = 201, description = "Event stored", body = IngestResponse),
        (status = 400, description = "Invalid JSON or missing message", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse),
        (status = 409, description = "Event already exists", body = ErrorResponse),
        (status = 500, description = "Key not configured or storage failure", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), IngestError> {
    if let Err(e) = authenticate(&state, &headers) {
        warn!("Rejected ingestion request: {}", e);
        return Err(e);
    }

    let id = state.ingestion_service.ingest(&body).await?;
    debug!("Ingested event {}", id);

    Ok((StatusCode::CREATED, Json(IngestResponse { id })))
}

/// List events grouped by message, most recently seen first
#[utoipa::path(
    get,
    path = "/api/events",
    params(ListEventsQuery),
    responses(
        (status = 200, description = "Event groups", body = Vec<EventGroupResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<Vec<EventGroupResponse>>, IngestError> {
    let limit = query.limit.clamp(1, MAX_GROUP_LIMIT);
    let groups = state.query_service.list_groups(limit).await?;

    Ok(Json(groups.into_iter().map(EventGroupResponse::from).collect()))
}

/// Get a single event with its decoded stacktrace and extra payload
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(
        ("id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EventResponse>, IngestError> {
    let event = state.query_service.get_event(&id).await?;
    Ok(Json(EventResponse::from(event)))
}
