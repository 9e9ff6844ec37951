use std::env;

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;

use crate::models::WeeklyAvailability;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub coach_id: String,
    pub coach_timezone: String,
    pub weekly_availability: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "courtbook.db".to_string()),
            coach_id: env::var("COACH_ID").unwrap_or_else(|_| "coach-primary".to_string()),
            coach_timezone: env::var("COACH_TIMEZONE")
                .unwrap_or_else(|_| "Australia/Hobart".to_string()),
            weekly_availability: env::var("WEEKLY_AVAILABILITY").ok(),
        }
    }
}

/// Scheduling constants, carried as an explicit struct so the core functions
/// never reach for globals and tests can construct variants freely.
#[derive(Clone, Debug)]
pub struct BookingPolicy {
    /// All business-rule evaluation (date boundaries, "today", closing time)
    /// happens in this timezone, whatever zone the wire instants used.
    pub timezone: Tz,
    pub lesson_duration: Duration,
    pub slot_step: Duration,
    pub max_group_size: i64,
    pub max_booking_days: i64,
    /// Daily closing boundary; no lesson may end past this local time.
    pub closing_time: NaiveTime,
    pub weekly_availability: WeeklyAvailability,
}

impl BookingPolicy {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let timezone: Tz = config
            .coach_timezone
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid COACH_TIMEZONE: {}", config.coach_timezone))?;

        let weekly_availability = match &config.weekly_availability {
            Some(json) => WeeklyAvailability::from_json(json)?,
            None => WeeklyAvailability::full_week(),
        };

        Ok(Self {
            timezone,
            lesson_duration: Duration::minutes(60),
            slot_step: Duration::minutes(30),
            max_group_size: 4,
            max_booking_days: 30,
            closing_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            weekly_availability,
        })
    }
}
