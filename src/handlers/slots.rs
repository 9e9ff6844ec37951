use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::scheduling;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: String,
    pub timezone: String,
    pub slots: Vec<String>,
}

// GET /api/slots?date=YYYY-MM-DD
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let date = query
        .date
        .as_deref()
        .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
        .ok_or_else(|| AppError::invalid("date", "Invalid date"))?;

    let policy = &state.policy;
    let now = Utc::now();
    let today = now.with_timezone(&policy.timezone).date_naive();

    let empty = SlotsResponse {
        date: date.to_string(),
        timezone: policy.timezone.name().to_string(),
        slots: vec![],
    };

    // Whole day outside the booking window: empty list, not an error.
    if date < today || date > today + Duration::days(policy.max_booking_days) {
        return Ok(Json(empty));
    }

    let candidates = scheduling::generate_slots(date, policy);
    if candidates.is_empty() {
        return Ok(Json(empty));
    }

    let Some((day_start, day_end)) = scheduling::day_bounds(date, policy.timezone) else {
        return Ok(Json(empty));
    };

    let bookings = {
        let db = state.db.lock().unwrap();
        queries::get_confirmed_bookings_in_range(&db, &state.config.coach_id, &day_start, &day_end)?
    };

    let slots: Vec<String> = scheduling::available_slots(candidates, &bookings, policy.lesson_duration)
        .into_iter()
        .filter(|slot| scheduling::slot_within_policy(*slot, now, policy))
        .map(|slot| slot.to_rfc3339_opts(SecondsFormat::Secs, false))
        .collect();

    Ok(Json(SlotsResponse {
        date: date.to_string(),
        timezone: policy.timezone.name().to_string(),
        slots,
    }))
}
