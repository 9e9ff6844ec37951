use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingInput, BookingUpdate};
use crate::services::scheduling;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub coach_id: String,
    pub student_name: String,
    pub skill_level: Option<String>,
    pub student_type: String,
    pub group_size: i64,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub created_at: String,
}

impl BookingResponse {
    /// Wire representation: instants rendered in the operating timezone.
    fn from_booking(b: &Booking, tz: Tz) -> Self {
        let fmt = |dt: &DateTime<Utc>| {
            dt.with_timezone(&tz)
                .to_rfc3339_opts(SecondsFormat::Secs, false)
        };
        Self {
            id: b.id.clone(),
            coach_id: b.coach_id.clone(),
            student_name: b.student_name.clone(),
            skill_level: b.skill_level.clone(),
            student_type: b.student_type.as_str().to_string(),
            group_size: b.group_size,
            contact_phone: b.contact_phone.clone(),
            contact_email: b.contact_email.clone(),
            start_time: fmt(&b.start_time),
            end_time: fmt(&b.end_time),
            status: b.status.as_str().to_string(),
            created_at: fmt(&b.created_at),
        }
    }
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Serialize)]
pub struct BookingsListResponse {
    pub bookings: Vec<BookingResponse>,
}

fn parse_range_bound(value: &str, field: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::invalid(field, "Invalid date range"))
}

// GET /api/bookings?from=..&to=..
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<BookingsListResponse>, AppError> {
    let now = Utc::now();
    let from = match query.from.as_deref() {
        Some(v) => parse_range_bound(v, "from")?,
        None => now,
    };
    let to = match query.to.as_deref() {
        Some(v) => parse_range_bound(v, "to")?,
        None => now + Duration::days(7),
    };

    scheduling::validate_range(from, to).map_err(AppError::Validation)?;

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_confirmed_bookings_in_range(&db, &state.config.coach_id, &from, &to)?
    };

    let tz = state.policy.timezone;
    Ok(Json(BookingsListResponse {
        bookings: bookings
            .iter()
            .map(|b| BookingResponse::from_booking(b, tz))
            .collect(),
    }))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BookingInput>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let now = Utc::now();
    let new = scheduling::validate_booking_input(&input, &state.policy)
        .map_err(AppError::Validation)?;
    let booking = Booking::from_new(&state.config.coach_id, new, now);

    {
        let mut db = state.db.lock().unwrap();
        // Friendly pre-check; the insert trigger is the actual guarantee.
        if queries::has_confirmed_overlap(
            &db,
            &booking.coach_id,
            &booking.start_time,
            &booking.end_time,
        )? {
            return Err(AppError::Conflict(
                "Time conflict with an existing booking".to_string(),
            ));
        }
        queries::insert_booking(&mut db, &booking)?;
    }

    tracing::info!(booking_id = %booking.id, start = %booking.start_time, "booking created");

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse::from_booking(&booking, state.policy.timezone)),
    ))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_id(&db, &state.config.coach_id, &id)?
    };

    match booking {
        Some(b) => Ok(Json(BookingResponse::from_booking(&b, state.policy.timezone))),
        None => Err(AppError::NotFound("Booking not found".to_string())),
    }
}

// PATCH /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<BookingUpdate>,
) -> Result<Json<BookingResponse>, AppError> {
    scheduling::validate_booking_update(&update, &state.policy).map_err(AppError::Validation)?;

    let updated = {
        let db = state.db.lock().unwrap();
        queries::update_booking(&db, &state.config.coach_id, &id, &update)?
    };

    match updated {
        Some(b) => Ok(Json(BookingResponse::from_booking(&b, state.policy.timezone))),
        None => Err(AppError::NotFound("Booking not found".to_string())),
    }
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = {
        let db = state.db.lock().unwrap();
        queries::delete_booking(&db, &state.config.coach_id, &id)?
    };

    if deleted {
        Ok(Json(serde_json::json!({ "success": true })))
    } else {
        Err(AppError::NotFound(
            "Booking not found or already deleted".to_string(),
        ))
    }
}
