use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::BookingPolicy;
use crate::models::{Booking, BookingInput, BookingStatus, BookingUpdate, NewBooking, StudentType};

/// Half-open interval overlap. An interval that starts exactly when another
/// ends does not overlap it, so back-to-back lessons are legal.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Tz>> {
    // earliest() picks the first occurrence across a DST fold and skips
    // instants that fall into the spring-forward gap.
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

/// Candidate lesson start instants for a calendar date, walked from each of
/// the weekday's availability blocks by the policy's slot step. A block too
/// short to hold a full lesson contributes nothing.
pub fn generate_slots(date: NaiveDate, policy: &BookingPolicy) -> Vec<DateTime<Tz>> {
    let weekday = date.weekday().number_from_monday();
    let blocks = policy.weekly_availability.blocks_for(weekday);

    let mut slots = Vec::new();
    for block in blocks {
        let (Some(block_start), Some(block_end)) = (
            local_instant(date, block.start, policy.timezone),
            local_instant(date, block.end, policy.timezone),
        ) else {
            continue;
        };

        // Last instant at which a full lesson still fits inside the block.
        let latest_start = block_end - policy.lesson_duration;
        let mut cursor = block_start;
        while cursor <= latest_start {
            slots.push(cursor);
            cursor += policy.slot_step;
        }
    }
    slots
}

/// UTC bounds of a local calendar day: midnight of `date` to midnight of the
/// next day in the operating timezone.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = local_instant(date, NaiveTime::MIN, tz)?;
    let end = local_instant(date + Duration::days(1), NaiveTime::MIN, tz)?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

/// Drop every candidate that overlaps a confirmed booking, preserving order.
pub fn available_slots(
    candidates: Vec<DateTime<Tz>>,
    bookings: &[Booking],
    lesson_duration: Duration,
) -> Vec<DateTime<Tz>> {
    candidates
        .into_iter()
        .filter(|slot| {
            let slot_start = slot.with_timezone(&Utc);
            let slot_end = slot_start + lesson_duration;
            !bookings
                .iter()
                .filter(|b| b.status == BookingStatus::Confirmed)
                .any(|b| overlaps(slot_start, slot_end, b.start_time, b.end_time))
        })
        .collect()
}

/// Time-policy legality for a single slot: not in the past, within the
/// booking horizon, and ending no later than the day's closing boundary.
/// Conflict filtering is handled separately by [`available_slots`].
pub fn slot_within_policy(slot: DateTime<Tz>, now: DateTime<Utc>, policy: &BookingPolicy) -> bool {
    let slot_start = slot.with_timezone(&Utc);
    if slot_start < now {
        return false;
    }

    let today = now.with_timezone(&policy.timezone).date_naive();
    if slot.date_naive() > today + Duration::days(policy.max_booking_days) {
        return false;
    }

    match local_instant(slot.date_naive(), policy.closing_time, policy.timezone) {
        Some(closing) => slot_start + policy.lesson_duration <= closing.with_timezone(&Utc),
        None => false,
    }
}

/// Older clients encode skill as a trailing "Name (Skill)" suffix. Split it
/// off at intake so skill level lives in its own column.
pub fn split_skill_suffix(name: &str) -> (String, Option<String>) {
    if let Some(idx) = name.rfind(" (") {
        if name.ends_with(')') {
            let skill = name[idx + 2..name.len() - 1].trim();
            if !skill.is_empty() {
                return (name[..idx].trim().to_string(), Some(skill.to_string()));
            }
        }
    }
    (name.to_string(), None)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validate a creation payload into a well-typed booking candidate. All
/// field checks run before returning so callers get the complete error map.
pub fn validate_booking_input(
    input: &BookingInput,
    policy: &BookingPolicy,
) -> Result<NewBooking, BTreeMap<String, String>> {
    let mut errors = BTreeMap::new();

    let student_name_raw = non_empty(input.student_name.as_deref());
    if student_name_raw.is_none() {
        errors.insert(
            "student_name".to_string(),
            "Student name is required".to_string(),
        );
    }

    let student_type = input.student_type.as_deref().and_then(StudentType::parse);
    if student_type.is_none() {
        errors.insert(
            "student_type".to_string(),
            "Student type must be 'kid' or 'adult'".to_string(),
        );
    }

    let group_size = match input.group_size {
        Some(n) if n >= 1 && n <= policy.max_group_size => Some(n),
        _ => {
            errors.insert(
                "group_size".to_string(),
                format!("Group size must be between 1 and {}", policy.max_group_size),
            );
            None
        }
    };

    let contact_phone = non_empty(input.contact_phone.as_deref());
    if contact_phone.is_none() {
        errors.insert(
            "contact_phone".to_string(),
            "Phone number is required".to_string(),
        );
    }

    let start_time = match non_empty(input.start_time.as_deref()) {
        None => {
            errors.insert(
                "start_time".to_string(),
                "Start time is required".to_string(),
            );
            None
        }
        Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                errors.insert(
                    "start_time".to_string(),
                    "Start time is invalid".to_string(),
                );
                None
            }
        },
    };

    match (
        student_name_raw,
        student_type,
        group_size,
        contact_phone,
        start_time,
    ) {
        (Some(name), Some(student_type), Some(group_size), Some(contact_phone), Some(start))
            if errors.is_empty() =>
        {
            let (student_name, suffix_skill) = split_skill_suffix(&name);
            let skill_level = non_empty(input.skill_level.as_deref()).or(suffix_skill);
            Ok(NewBooking {
                student_name,
                skill_level,
                student_type,
                group_size,
                contact_phone,
                contact_email: non_empty(input.contact_email.as_deref()),
                start_time: start,
                end_time: start + policy.lesson_duration,
            })
        }
        _ => Err(errors),
    }
}

/// Edit-path validation: only provided fields are checked; start and end
/// times are not editable, so no conflict re-check happens here.
pub fn validate_booking_update(
    update: &BookingUpdate,
    policy: &BookingPolicy,
) -> Result<(), BTreeMap<String, String>> {
    let mut errors = BTreeMap::new();

    if let Some(name) = &update.student_name {
        if name.trim().is_empty() {
            errors.insert(
                "student_name".to_string(),
                "Student name is required".to_string(),
            );
        }
    }

    if let Some(student_type) = &update.student_type {
        if StudentType::parse(student_type).is_none() {
            errors.insert(
                "student_type".to_string(),
                "Student type must be 'kid' or 'adult'".to_string(),
            );
        }
    }

    if let Some(n) = update.group_size {
        if n < 1 || n > policy.max_group_size {
            errors.insert(
                "group_size".to_string(),
                format!("Group size must be between 1 and {}", policy.max_group_size),
            );
        }
    }

    if let Some(phone) = &update.contact_phone {
        if phone.trim().is_empty() {
            errors.insert(
                "contact_phone".to_string(),
                "Phone number is required".to_string(),
            );
        }
    }

    if let Some(status) = &update.status {
        if BookingStatus::parse(status).is_none() {
            errors.insert(
                "status".to_string(),
                "Status must be 'confirmed' or 'cancelled'".to_string(),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A range query is only valid when `to` is strictly after `from`.
pub fn validate_range(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<(), BTreeMap<String, String>> {
    if to <= from {
        let mut errors = BTreeMap::new();
        errors.insert("to".to_string(), "'to' must be after 'from'".to_string());
        return Err(errors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeeklyAvailability;

    fn policy() -> BookingPolicy {
        BookingPolicy {
            timezone: chrono_tz::Australia::Hobart,
            lesson_duration: Duration::minutes(60),
            slot_step: Duration::minutes(30),
            max_group_size: 4,
            max_booking_days: 30,
            closing_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            weekly_availability: WeeklyAvailability::full_week(),
        }
    }

    fn policy_with(template: &str) -> BookingPolicy {
        BookingPolicy {
            weekly_availability: WeeklyAvailability::from_json(template).unwrap(),
            ..policy()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn hobart(s: &str) -> DateTime<Utc> {
        let naive = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        chrono_tz::Australia::Hobart
            .from_local_datetime(&naive)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn confirmed_booking(start: &str, end: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: "b-1".to_string(),
            coach_id: "coach-primary".to_string(),
            student_name: "Alice".to_string(),
            skill_level: None,
            student_type: StudentType::Adult,
            group_size: 1,
            contact_phone: "+61400000000".to_string(),
            contact_email: None,
            start_time: hobart(start),
            end_time: hobart(end),
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_overlaps_symmetric() {
        let (a, b) = (hobart("2026-03-02 10:00"), hobart("2026-03-02 11:00"));
        let (c, d) = (hobart("2026-03-02 10:30"), hobart("2026-03-02 11:30"));
        assert!(overlaps(a, b, c, d));
        assert_eq!(overlaps(a, b, c, d), overlaps(c, d, a, b));
    }

    #[test]
    fn test_back_to_back_does_not_overlap() {
        let (a, b) = (hobart("2026-03-02 10:00"), hobart("2026-03-02 11:00"));
        let (c, d) = (hobart("2026-03-02 11:00"), hobart("2026-03-02 12:00"));
        assert!(!overlaps(a, b, c, d));
        assert!(!overlaps(c, d, a, b));
    }

    #[test]
    fn test_contained_interval_overlaps() {
        let (a, b) = (hobart("2026-03-02 10:00"), hobart("2026-03-02 12:00"));
        let (c, d) = (hobart("2026-03-02 10:30"), hobart("2026-03-02 11:00"));
        assert!(overlaps(a, b, c, d));
    }

    // Full-day template, 60 min lessons, 30 min step: 08:00 through 19:00
    // inclusive is 23 slots; 19:30 would end past the 20:00 close.
    #[test]
    fn test_generate_slots_full_day() {
        let slots = generate_slots(date("2026-03-02"), &policy());
        assert_eq!(slots.len(), 23);
        assert_eq!(slots[0].format("%H:%M").to_string(), "08:00");
        assert_eq!(slots[22].format("%H:%M").to_string(), "19:00");
    }

    #[test]
    fn test_generate_slots_evenly_spaced_and_monotonic() {
        let p = policy();
        let slots = generate_slots(date("2026-03-02"), &p);
        for pair in slots.windows(2) {
            assert_eq!(pair[1] - pair[0], p.slot_step);
        }
    }

    #[test]
    fn test_generate_slots_never_exceed_block_end() {
        let p = policy();
        let block_end = hobart("2026-03-02 20:00");
        for slot in generate_slots(date("2026-03-02"), &p) {
            assert!(slot.with_timezone(&Utc) + p.lesson_duration <= block_end);
        }
    }

    #[test]
    fn test_generate_slots_unconfigured_weekday() {
        // Template only covers Monday; 2026-03-03 is a Tuesday.
        let p = policy_with(r#"{"1":[{"start":"09:00","end":"17:00"}]}"#);
        assert!(generate_slots(date("2026-03-03"), &p).is_empty());
    }

    #[test]
    fn test_generate_slots_block_shorter_than_lesson() {
        let p = policy_with(r#"{"1":[{"start":"09:00","end":"09:30"}]}"#);
        assert!(generate_slots(date("2026-03-02"), &p).is_empty());
    }

    #[test]
    fn test_generate_slots_block_exactly_one_lesson() {
        let p = policy_with(r#"{"1":[{"start":"09:00","end":"10:00"}]}"#);
        let slots = generate_slots(date("2026-03-02"), &p);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].format("%H:%M").to_string(), "09:00");
    }

    #[test]
    fn test_generate_slots_multiple_blocks_in_order() {
        let p = policy_with(r#"{"1":[{"start":"08:00","end":"10:00"},{"start":"14:00","end":"16:00"}]}"#);
        let slots = generate_slots(date("2026-03-02"), &p);
        let times: Vec<String> = slots
            .iter()
            .map(|s| s.format("%H:%M").to_string())
            .collect();
        assert_eq!(times, vec!["08:00", "08:30", "09:00", "14:00", "14:30", "15:00"]);
    }

    #[test]
    fn test_available_slots_filters_overlaps() {
        let p = policy();
        let booking = confirmed_booking("2026-03-02 10:00", "2026-03-02 11:00");
        let candidates = generate_slots(date("2026-03-02"), &p);
        let open = available_slots(candidates, &[booking.clone()], p.lesson_duration);

        let times: Vec<String> = open.iter().map(|s| s.format("%H:%M").to_string()).collect();
        // 09:30 ends 10:30 (overlap), 10:00 and 10:30 overlap; 09:00 ends
        // at 10:00 and 11:00 starts at the booking's end, both legal.
        assert!(!times.contains(&"09:30".to_string()));
        assert!(!times.contains(&"10:00".to_string()));
        assert!(!times.contains(&"10:30".to_string()));
        assert!(times.contains(&"09:00".to_string()));
        assert!(times.contains(&"11:00".to_string()));
        assert_eq!(open.len(), 20);

        for slot in &open {
            let start = slot.with_timezone(&Utc);
            assert!(!overlaps(
                start,
                start + p.lesson_duration,
                booking.start_time,
                booking.end_time
            ));
        }
    }

    #[test]
    fn test_available_slots_ignores_cancelled() {
        let p = policy();
        let mut booking = confirmed_booking("2026-03-02 10:00", "2026-03-02 11:00");
        booking.status = BookingStatus::Cancelled;
        let candidates = generate_slots(date("2026-03-02"), &p);
        let open = available_slots(candidates.clone(), &[booking], p.lesson_duration);
        assert_eq!(open.len(), candidates.len());
    }

    #[test]
    fn test_available_slots_pure() {
        let p = policy();
        let booking = confirmed_booking("2026-03-02 10:00", "2026-03-02 11:00");
        let candidates = generate_slots(date("2026-03-02"), &p);
        let a = available_slots(candidates.clone(), &[booking.clone()], p.lesson_duration);
        let b = available_slots(candidates, &[booking], p.lesson_duration);
        assert_eq!(a, b);
    }

    #[test]
    fn test_slot_within_policy_rejects_past() {
        let p = policy();
        let slot = hobart("2026-03-02 10:00").with_timezone(&p.timezone);
        let now = hobart("2026-03-02 10:30");
        assert!(!slot_within_policy(slot, now, &p));
        assert!(slot_within_policy(slot, hobart("2026-03-02 09:00"), &p));
    }

    #[test]
    fn test_slot_within_policy_rejects_beyond_horizon() {
        let p = policy();
        let now = hobart("2026-03-02 09:00");
        let inside = hobart("2026-04-01 10:00").with_timezone(&p.timezone);
        let outside = hobart("2026-04-16 10:00").with_timezone(&p.timezone);
        assert!(slot_within_policy(inside, now, &p));
        assert!(!slot_within_policy(outside, now, &p));
    }

    #[test]
    fn test_slot_within_policy_rejects_past_closing() {
        // Template open past closing time: the closing boundary still wins.
        let p = policy_with(r#"{"1":[{"start":"08:00","end":"21:00"}]}"#);
        let now = hobart("2026-03-02 07:00");
        let fits = hobart("2026-03-02 19:00").with_timezone(&p.timezone);
        let too_late = hobart("2026-03-02 19:30").with_timezone(&p.timezone);
        assert!(slot_within_policy(fits, now, &p));
        assert!(!slot_within_policy(too_late, now, &p));
    }

    #[test]
    fn test_validate_booking_input_ok() {
        let input = BookingInput {
            student_name: Some("  Alice  ".to_string()),
            student_type: Some("adult".to_string()),
            group_size: Some(2),
            contact_phone: Some("+61400000000".to_string()),
            contact_email: Some("".to_string()),
            start_time: Some("2026-03-02T10:00:00+11:00".to_string()),
            ..Default::default()
        };
        let new = validate_booking_input(&input, &policy()).unwrap();
        assert_eq!(new.student_name, "Alice");
        assert_eq!(new.student_type, StudentType::Adult);
        assert_eq!(new.contact_email, None);
        assert_eq!(new.end_time - new.start_time, Duration::minutes(60));
    }

    #[test]
    fn test_validate_booking_input_group_size_out_of_bounds() {
        let input = BookingInput {
            student_name: Some("Alice".to_string()),
            student_type: Some("adult".to_string()),
            group_size: Some(5),
            contact_phone: Some("+61400000000".to_string()),
            start_time: Some("2026-03-02T10:00:00+11:00".to_string()),
            ..Default::default()
        };
        let errors = validate_booking_input(&input, &policy()).unwrap_err();
        assert_eq!(
            errors.get("group_size").unwrap(),
            "Group size must be between 1 and 4"
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_validate_booking_input_reports_all_missing_fields() {
        let errors = validate_booking_input(&BookingInput::default(), &policy()).unwrap_err();
        assert!(errors.contains_key("student_name"));
        assert!(errors.contains_key("student_type"));
        assert!(errors.contains_key("group_size"));
        assert!(errors.contains_key("contact_phone"));
        assert!(errors.contains_key("start_time"));
    }

    #[test]
    fn test_validate_booking_input_bad_start_time() {
        let input = BookingInput {
            student_name: Some("Alice".to_string()),
            student_type: Some("kid".to_string()),
            group_size: Some(1),
            contact_phone: Some("+61400000000".to_string()),
            start_time: Some("next tuesday".to_string()),
            ..Default::default()
        };
        let errors = validate_booking_input(&input, &policy()).unwrap_err();
        assert_eq!(errors.get("start_time").unwrap(), "Start time is invalid");
    }

    #[test]
    fn test_skill_suffix_split() {
        assert_eq!(
            split_skill_suffix("Alice (Beginner)"),
            ("Alice".to_string(), Some("Beginner".to_string()))
        );
        assert_eq!(split_skill_suffix("Alice"), ("Alice".to_string(), None));
        assert_eq!(split_skill_suffix("Alice ()"), ("Alice ()".to_string(), None));
    }

    #[test]
    fn test_explicit_skill_level_wins_over_suffix() {
        let input = BookingInput {
            student_name: Some("Alice (Beginner)".to_string()),
            skill_level: Some("Intermediate".to_string()),
            student_type: Some("adult".to_string()),
            group_size: Some(1),
            contact_phone: Some("+61400000000".to_string()),
            start_time: Some("2026-03-02T10:00:00+11:00".to_string()),
            ..Default::default()
        };
        let new = validate_booking_input(&input, &policy()).unwrap();
        assert_eq!(new.student_name, "Alice");
        assert_eq!(new.skill_level.as_deref(), Some("Intermediate"));
    }

    #[test]
    fn test_validate_update_provided_fields_only() {
        let update = BookingUpdate {
            group_size: Some(5),
            ..Default::default()
        };
        let errors = validate_booking_update(&update, &policy()).unwrap_err();
        assert!(errors.contains_key("group_size"));

        let update = BookingUpdate {
            student_name: Some("Bob".to_string()),
            status: Some("cancelled".to_string()),
            ..Default::default()
        };
        assert!(validate_booking_update(&update, &policy()).is_ok());
    }

    #[test]
    fn test_validate_range() {
        let from = hobart("2026-03-02 10:00");
        assert!(validate_range(from, from + Duration::hours(1)).is_ok());
        assert!(validate_range(from, from).is_err());
        assert!(validate_range(from, from - Duration::hours(1)).is_err());
    }
}
