//! Thin HTTP surface over `BookingService`. Route shapes follow
//! `examples/original_source/src/modules/bookings/routes.py`; axum/tower
//! wiring follows `examples/iqrahapp-iqrah-mobile/backend/crates/api`.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};

use booking_core::{AccountEmail, CreateBookingInput, RoomId, UpdateBookingInput, UserRoles};

use crate::auth::Claims;
use crate::dto::{BookingDto, CreateBookingRequest, UpdateBookingRequest, WindowQuery};
use crate::error::ApiError;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/me", get(my_bookings))
        .route("/bookings/:id", patch(update_booking).delete(cancel_booking))
        .with_state(state)
}

/// `now - 7d .. now + 14d`, matching `routes.py::_default_date_range`.
fn default_window() -> (chrono::DateTime<chrono::FixedOffset>, chrono::DateTime<chrono::FixedOffset>) {
    let now = shared::time::to_msk(Utc::now());
    (now - Duration::days(7), now + Duration::days(14))
}

fn resolve_window(
    query: &WindowQuery,
) -> (chrono::DateTime<chrono::FixedOffset>, chrono::DateTime<chrono::FixedOffset>) {
    let (default_start, default_end) = default_window();
    (
        query.start.unwrap_or(default_start),
        query.end.unwrap_or(default_end),
    )
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError(shared::GatewayError::Validation("missing Authorization header".to_string())))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError(shared::GatewayError::Validation("expected a Bearer token".to_string())))?;
    Ok(state.jwt_decoder.decode(token)?)
}

async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<BookingDto>>, ApiError> {
    let (start, end) = resolve_window(&query);
    let room_ids: Vec<RoomId> = match &query.room_ids {
        Some(raw) => raw.split(',').map(RoomId::from).collect(),
        None => state
            .registry
            .all(false)
            .into_iter()
            .map(|r| r.id.clone())
            .collect(),
    };
    let bookings = state.booking_service.bookings_for_rooms(&room_ids, start, end).await?;
    Ok(Json(bookings.iter().map(BookingDto::from).collect()))
}

async fn my_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<BookingDto>>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let (start, end) = resolve_window(&query);
    let bookings = state
        .booking_service
        .bookings_for_user(&AccountEmail::from(claims.email), start, end)
        .await?;
    Ok(Json(bookings.iter().map(BookingDto::from).collect()))
}

async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingDto>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let organizer = AccountEmail::from(claims.email.clone());
    let user = state
        .user_directory
        .get_user_by_email(&organizer)
        .await?
        .ok_or_else(|| shared::GatewayError::NotFound(format!("user {}", claims.email)))?;
    let room_id = RoomId::from(req.room_id);
    let in_access_list = state.registry.user_has_access(&organizer, &room_id);

    let booking = state
        .booking_service
        .create(CreateBookingInput {
            room_id,
            start: req.start,
            end: req.end,
            title: req.title,
            organizer_email: organizer,
            participants: req.participants.into_iter().map(AccountEmail::from).collect(),
            user_roles: UserRoles {
                is_student: user.is_student,
                is_staff: user.is_staff,
            },
            in_access_list,
        })
        .await?;
    Ok(Json(BookingDto::from(&booking)))
}

async fn update_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<Option<BookingDto>>, ApiError> {
    authenticate(&state, &headers)?;
    let updated = state
        .booking_service
        .update(
            &id,
            UpdateBookingInput {
                start: req.start,
                end: req.end,
                title: req.title,
            },
        )
        .await?;
    Ok(Json(updated.as_ref().map(BookingDto::from)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<bool>, ApiError> {
    let claims = authenticate(&state, &headers)?;
    let cancelled = state
        .booking_service
        .cancel(&id, &AccountEmail::from(claims.email))
        .await?;
    Ok(Json(cancelled))
}
