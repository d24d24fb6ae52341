use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use ticket_core::{Event, Page};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{Claims, Role};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub price: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub capacity: i32,
}

/// Only the name and the schedule can change after creation.
#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub name: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}

async fn list_events(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.events.list_events(page).await?))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    Ok(Json(state.events.get_event(id).await?))
}

async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    claims.require(&[Role::Organizer, Role::Admin])?;

    let event = Event::new(
        Some(Uuid::new_v4()),
        req.name,
        req.price,
        req.start_at,
        req.end_at,
        req.capacity,
    )?;
    state.events.create_event(&event).await?;

    info!(event_id = %event.id(), capacity = event.capacity(), "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    claims.require(&[Role::Organizer, Role::Admin])?;

    let mut event = state.events.get_event(id).await?;
    event.update_name(req.name)?;
    event.reschedule(req.start_at, req.end_at)?;
    state.events.update_event(&event).await?;

    Ok(Json(state.events.get_event(id).await?))
}

async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    claims.require(&[Role::Admin])?;

    state.events.delete_event(id).await?;
    info!(event_id = %id, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}
