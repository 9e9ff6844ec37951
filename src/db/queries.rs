use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use crate::models::{Booking, BookingStatus, BookingUpdate, StudentType};

const BOOKING_COLUMNS: &str = "id, coach_id, student_name, skill_level, student_type, group_size, \
     contact_phone, contact_email, start_time, end_time, status, created_at, updated_at";

// Uniform RFC 3339 UTC so the stored strings sort chronologically and the
// overlap triggers can compare them directly.
fn format_instant(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_instant(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Create a booking. Runs in an IMMEDIATE transaction; the
/// `bookings_no_overlap_insert` trigger aborts with 'booking overlap' if a
/// confirmed booking for the same coach already occupies the interval, so
/// two racing creates for one slot produce exactly one winner.
pub fn insert_booking(conn: &mut Connection, booking: &Booking) -> rusqlite::Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute(
        "INSERT INTO bookings (id, coach_id, student_name, skill_level, student_type, group_size,
                               contact_phone, contact_email, start_time, end_time, status,
                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            booking.id,
            booking.coach_id,
            booking.student_name,
            booking.skill_level,
            booking.student_type.as_str(),
            booking.group_size,
            booking.contact_phone,
            booking.contact_email,
            format_instant(&booking.start_time),
            format_instant(&booking.end_time),
            booking.status.as_str(),
            format_instant(&booking.created_at),
            format_instant(&booking.updated_at),
        ],
    )?;
    tx.commit()
}

/// Confirmed bookings with `start_time` in `[from, to)`, ascending.
pub fn get_confirmed_bookings_in_range(
    conn: &Connection,
    coach_id: &str,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> rusqlite::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE coach_id = ?1 AND status = 'confirmed'
           AND start_time >= ?2 AND start_time < ?3
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(
        params![coach_id, format_instant(from), format_instant(to)],
        parse_booking_row,
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

/// Best-effort pre-check before an insert attempt; the insert trigger is
/// what actually guarantees the invariant.
pub fn has_confirmed_overlap(
    conn: &Connection,
    coach_id: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE coach_id = ?1 AND status = 'confirmed'
           AND start_time < ?2 AND end_time > ?3",
        params![coach_id, format_instant(end), format_instant(start)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn get_booking_by_id(
    conn: &Connection,
    coach_id: &str,
    id: &str,
) -> rusqlite::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1 AND coach_id = ?2"),
        params![id, coach_id],
        parse_booking_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Apply the mutable fields of an edit; absent fields keep their value.
/// Start and end times never change here. Returns the updated row, or
/// `None` when the booking does not exist for this coach.
pub fn update_booking(
    conn: &Connection,
    coach_id: &str,
    id: &str,
    update: &BookingUpdate,
) -> rusqlite::Result<Option<Booking>> {
    let Some(existing) = get_booking_by_id(conn, coach_id, id)? else {
        return Ok(None);
    };

    let student_name = update
        .student_name
        .as_deref()
        .map(str::trim)
        .map(str::to_string)
        .unwrap_or_else(|| existing.student_name.clone());
    let skill_level = update.skill_level.clone().or_else(|| existing.skill_level.clone());
    let student_type = update
        .student_type
        .as_deref()
        .and_then(StudentType::parse)
        .unwrap_or(existing.student_type);
    let group_size = update.group_size.unwrap_or(existing.group_size);
    let contact_phone = update
        .contact_phone
        .clone()
        .unwrap_or_else(|| existing.contact_phone.clone());
    let contact_email = update
        .contact_email
        .clone()
        .or_else(|| existing.contact_email.clone());
    let status = update
        .status
        .as_deref()
        .and_then(BookingStatus::parse)
        .unwrap_or(existing.status);
    let updated_at = Utc::now();

    conn.execute(
        "UPDATE bookings
         SET student_name = ?1, skill_level = ?2, student_type = ?3, group_size = ?4,
             contact_phone = ?5, contact_email = ?6, status = ?7, updated_at = ?8
         WHERE id = ?9 AND coach_id = ?10",
        params![
            student_name,
            skill_level,
            student_type.as_str(),
            group_size,
            contact_phone,
            contact_email,
            status.as_str(),
            format_instant(&updated_at),
            id,
            coach_id,
        ],
    )?;

    Ok(Some(Booking {
        student_name,
        skill_level,
        student_type,
        group_size,
        contact_phone,
        contact_email,
        status,
        updated_at,
        ..existing
    }))
}

/// Delete by id. Deleting an already-deleted booking reports false so the
/// caller can surface "not found".
pub fn delete_booking(conn: &Connection, coach_id: &str, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "DELETE FROM bookings WHERE id = ?1 AND coach_id = ?2",
        params![id, coach_id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let student_type_str: String = row.get(4)?;
    let status_str: String = row.get(10)?;
    let start_time_str: String = row.get(8)?;
    let end_time_str: String = row.get(9)?;
    let created_at_str: String = row.get(11)?;
    let updated_at_str: String = row.get(12)?;

    Ok(Booking {
        id: row.get(0)?,
        coach_id: row.get(1)?,
        student_name: row.get(2)?,
        skill_level: row.get(3)?,
        student_type: StudentType::parse(&student_type_str).unwrap_or(StudentType::Adult),
        group_size: row.get(5)?,
        contact_phone: row.get(6)?,
        contact_email: row.get(7)?,
        start_time: parse_instant(&start_time_str),
        end_time: parse_instant(&end_time_str),
        status: BookingStatus::parse(&status_str).unwrap_or(BookingStatus::Confirmed),
        created_at: parse_instant(&created_at_str),
        updated_at: parse_instant(&updated_at_str),
    })
}
