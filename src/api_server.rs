//! HTTP surface for the calendar store.
//
// Thin axum handlers: validate the payload, call into the store/core, map
// domain errors onto status codes. No business logic lives here beyond the
// RSVP capacity gate, which sits with the caller of the aggregator rather
// than inside it.

use anyhow::{anyhow, Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use log::info;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::export::{self, ExportError};
use crate::models::{Event, EventDraft, EventPatch, Rsvp, RsvpDraft, RsvpPatch, RsvpStatus};
use crate::rsvp::{self, RsvpCounts};
use crate::store::{CalendarStats, EventFilter, EventStore, StoreError};
use crate::validation::{
    validate_event_draft, validate_event_patch, validate_rsvp_draft, validate_rsvp_patch,
    ValidationError,
};

pub struct ApiState {
    pub store: EventStore,
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct RsvpListResponse {
    pub rsvps: Vec<Rsvp>,
    pub counts: RsvpCounts,
}

type ApiError = (StatusCode, Json<ApiResponse>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse { success: false, message: message.into() }))
}

fn validation_error(err: ValidationError) -> ApiError {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
}

fn store_error(err: StoreError) -> ApiError {
    let status = match err {
        StoreError::EventNotFound | StoreError::RsvpNotFound => StatusCode::NOT_FOUND,
        StoreError::EmptyPatch => StatusCode::BAD_REQUEST,
        StoreError::DuplicateRsvp => StatusCode::CONFLICT,
        StoreError::Io(_) | StoreError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Community Calendar API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

async fn create_event_handler(
    State(state): State<Arc<ApiState>>,
    Json(draft): Json<EventDraft>,
) -> Result<Json<Event>, ApiError> {
    validate_event_draft(&draft).map_err(validation_error)?;
    let event = state.store.create_event(draft).map_err(store_error)?;
    Ok(Json(event))
}

async fn list_events_handler(
    State(state): State<Arc<ApiState>>,
    Query(filter): Query<EventFilter>,
) -> Json<Vec<Event>> {
    Json(state.store.list_events(&filter))
}

async fn get_event_handler(
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<i64>,
) -> Result<Json<Event>, ApiError> {
    state
        .store
        .get_event(event_id)
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Event not found"))
}

async fn update_event_handler(
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<i64>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<Event>, ApiError> {
    validate_event_patch(&patch).map_err(validation_error)?;
    let event = state.store.update_event(event_id, patch).map_err(store_error)?;
    Ok(Json(event))
}

async fn delete_event_handler(
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<i64>,
) -> Result<Json<ApiResponse>, ApiError> {
    state.store.delete_event(event_id).map_err(store_error)?;
    Ok(Json(ApiResponse {
        success: true,
        message: format!("Event {} deleted successfully", event_id),
    }))
}

async fn events_by_date_handler(
    State(state): State<Arc<ApiState>>,
    Path(date): Path<NaiveDate>,
) -> Json<Vec<Event>> {
    Json(state.store.events_on(date))
}

async fn stats_handler(State(state): State<Arc<ApiState>>) -> Json<CalendarStats> {
    Json(state.store.stats(Utc::now()))
}

async fn create_rsvp_handler(
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<i64>,
    Json(draft): Json<RsvpDraft>,
) -> Result<Json<Rsvp>, ApiError> {
    validate_rsvp_draft(&draft).map_err(validation_error)?;
    if draft.status == RsvpStatus::Going {
        ensure_capacity(&state.store, event_id)?;
    }
    let rsvp = state.store.insert_rsvp(event_id, draft).map_err(store_error)?;
    Ok(Json(rsvp))
}

async fn list_rsvps_handler(
    State(state): State<Arc<ApiState>>,
    Path(event_id): Path<i64>,
) -> Result<Json<RsvpListResponse>, ApiError> {
    let rsvps = state.store.list_rsvps(event_id).map_err(store_error)?;
    let counts = rsvp::aggregate(&rsvps);
    Ok(Json(RsvpListResponse { rsvps, counts }))
}

async fn update_rsvp_handler(
    State(state): State<Arc<ApiState>>,
    Path(rsvp_id): Path<i64>,
    Json(patch): Json<RsvpPatch>,
) -> Result<Json<Rsvp>, ApiError> {
    validate_rsvp_patch(&patch).map_err(validation_error)?;
    if patch.status == Some(RsvpStatus::Going) {
        let current = state
            .store
            .get_rsvp(rsvp_id)
            .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "RSVP not found"))?;
        if current.status != RsvpStatus::Going {
            ensure_capacity(&state.store, current.event_id)?;
        }
    }
    let rsvp = state.store.update_rsvp(rsvp_id, patch).map_err(store_error)?;
    Ok(Json(rsvp))
}

async fn delete_rsvp_handler(
    State(state): State<Arc<ApiState>>,
    Path(rsvp_id): Path<i64>,
) -> Result<Json<ApiResponse>, ApiError> {
    state.store.delete_rsvp(rsvp_id).map_err(store_error)?;
    Ok(Json(ApiResponse { success: true, message: "RSVP deleted successfully".to_string() }))
}

/// Reject a new or changed "going" RSVP that would push the event past its
/// attendance cap.
fn ensure_capacity(store: &EventStore, event_id: i64) -> Result<(), ApiError> {
    let event = store
        .get_event(event_id)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Event not found"))?;
    let rsvps = store.list_rsvps(event_id).map_err(store_error)?;
    let counts = rsvp::aggregate(&rsvps);
    if !rsvp::has_capacity(counts, event.max_attendees) {
        return Err(error_response(StatusCode::CONFLICT, "Event is at full capacity"));
    }
    Ok(())
}

async fn export_ics_handler(
    State(state): State<Arc<ApiState>>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.store.list_events(&EventFilter::default());
    let document = export::serialize(&events, Utc::now()).map_err(|err| match err {
        ExportError::EmptyExportSet => error_response(StatusCode::NOT_FOUND, err.to_string()),
    })?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"calendar.ics\""),
        ],
        document,
    ))
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/events", post(create_event_handler).get(list_events_handler))
        .route(
            "/api/events/{event_id}",
            get(get_event_handler).put(update_event_handler).delete(delete_event_handler),
        )
        .route("/api/events/date/{date}", get(events_by_date_handler))
        .route("/api/events/{event_id}/rsvps", post(create_rsvp_handler).get(list_rsvps_handler))
        .route("/api/rsvps/{rsvp_id}", put(update_rsvp_handler).delete(delete_rsvp_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/export/ics", get(export_ics_handler))
        .layer(cors)
        .with_state(state)
}

/// Create and start the API server.
pub async fn start_api_server(config: Config) -> Result<()> {
    let store = EventStore::new(config.storage.resolved_state_dir()?)?;
    let state = Arc::new(ApiState { store });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!("Invalid server address {}:{}", config.server.host, config.server.port)
        })?;
    info!("API server starting on http://{}", addr);

    let listener =
        TcpListener::bind(addr).await.map_err(|e| anyhow!("Failed to bind to address: {}", e))?;
    axum::serve(listener, app).await.map_err(|e| anyhow!("Failed to start API server: {}", e))?;

    Ok(())
}
