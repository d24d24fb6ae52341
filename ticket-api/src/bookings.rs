use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use ticket_core::{Booking, Page};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{Claims, Role};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/bookings", post(reserve))
        .route("/bookings", get(list_bookings))
        .route("/bookings/{id}", get(get_booking).delete(delete_booking))
        .route("/bookings/{id}/confirm", post(confirm_booking))
        .route("/bookings/{id}/cancel", post(cancel_booking))
}

/// Book one spot on the event for the authenticated caller.
async fn reserve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.reservations.reserve(event_id, &claims.email).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Booking>>, AppError> {
    claims.require(&[Role::Admin])?;
    Ok(Json(state.bookings.list_bookings(page).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    claims.require(&[Role::Admin])?;
    Ok(Json(state.bookings.get_booking_by_id(id).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    claims.require(&[Role::Admin])?;
    Ok(Json(state.bookings.confirm_booking(id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    claims.require(&[Role::Admin])?;
    Ok(Json(state.bookings.cancel_booking(id).await?))
}

async fn delete_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    claims.require(&[Role::Admin])?;
    state.bookings.delete_booking(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
