use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub coach_id: String,
    pub student_name: String,
    pub skill_level: Option<String>,
    pub student_type: StudentType,
    pub group_size: i64,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Materialize a validated intake as a confirmed booking row.
    pub fn from_new(coach_id: &str, new: NewBooking, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            coach_id: coach_id.to_string(),
            student_name: new.student_name,
            skill_level: new.skill_level,
            student_type: new.student_type,
            group_size: new.group_size,
            contact_phone: new.contact_phone,
            contact_email: new.contact_email,
            start_time: new.start_time,
            end_time: new.end_time,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StudentType {
    Kid,
    Adult,
}

impl StudentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentType::Kid => "kid",
            StudentType::Adult => "adult",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kid" => Some(StudentType::Kid),
            "adult" => Some(StudentType::Adult),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Raw intake payload. Everything is optional so the validator can report
/// every missing field at once instead of failing on the first.
#[derive(Debug, Default, Deserialize)]
pub struct BookingInput {
    pub student_name: Option<String>,
    pub skill_level: Option<String>,
    pub student_type: Option<String>,
    pub group_size: Option<i64>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub start_time: Option<String>,
}

/// Mutable subset for edits. Start and end times are immutable once booked.
#[derive(Debug, Default, Deserialize)]
pub struct BookingUpdate {
    pub student_name: Option<String>,
    pub skill_level: Option<String>,
    pub student_type: Option<String>,
    pub group_size: Option<i64>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub status: Option<String>,
}

/// Output of intake validation: well-typed, trimmed, with the end time
/// derived from the policy's fixed lesson duration.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_name: String,
    pub skill_level: Option<String>,
    pub student_type: StudentType,
    pub group_size: i64,
    pub contact_phone: String,
    pub contact_email: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
