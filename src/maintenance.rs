//! Maintenance-window & silence evaluator (spec.md §4.5). Pure functions over
//! already-fetched CRD specs, no cluster I/O — the same "pure evaluation,
//! caller does the listing" split as the teacher's `governance.rs`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rrule::RRuleSet;

use crate::errors::{Error, Result};

/// How many occurrences to materialize before giving up. Generous enough for
/// any interval/duration pair a maintenance window would realistically use;
/// a schedule that still hasn't reached "now" after this many occurrences is
/// treated as not currently active rather than searched indefinitely.
const MAX_OCCURRENCES: u16 = 10_000;

/// Turns an RFC3339 instant into the iCalendar DTSTART form the RRULE
/// parser expects (`20260103T000000Z`, no dashes or colons).
fn ical_datetime(rfc3339: &str) -> Result<String> {
    let parsed = DateTime::parse_from_rfc3339(rfc3339)
        .map_err(|e| Error::Rrule(format!("invalid dtstart {rfc3339}: {e}")))?;
    Ok(parsed.with_timezone(&Utc).format("%Y%m%dT%H%M%SZ").to_string())
}

fn build_rrule_set(schedule: &str, dtstart: Option<&str>) -> Result<RRuleSet> {
    let dtstart = match dtstart {
        Some(d) => ical_datetime(d)?,
        None => "19700101T000000Z".to_string(),
    };
    let source = format!("DTSTART:{dtstart}\nRRULE:{schedule}");
    source.parse::<RRuleSet>().map_err(|e| Error::Rrule(e.to_string()))
}

/// Validates that `schedule`/`dtstart` together form a parseable RRULE,
/// without evaluating anything. Used by `reconcile::maintenance_window`.
pub fn validate_rrule(schedule: &str, dtstart: Option<&str>) -> std::result::Result<(), String> {
    build_rrule_set(schedule, dtstart).map(|_| ()).map_err(|e| e.to_string())
}

/// True iff there exists an occurrence `O` of `schedule` such that
/// `O <= now < O + duration_minutes` (spec.md §3/§4.5).
pub fn is_in_maintenance_window(
    schedule: &str,
    dtstart: Option<&str>,
    duration_minutes: u32,
    now: DateTime<Utc>,
) -> Result<bool> {
    let set = build_rrule_set(schedule, dtstart)?;
    let duration = ChronoDuration::minutes(duration_minutes as i64);
    let result = set.all(MAX_OCCURRENCES);
    Ok(result
        .dates
        .into_iter()
        .map(|occurrence| occurrence.with_timezone(&Utc))
        .any(|occurrence| occurrence <= now && now < occurrence + duration))
}

/// True iff `now` falls within `[starts_at, ends_at)` (spec.md §3/§4.5).
pub fn is_silenced(starts_at: &str, ends_at: &str, now: DateTime<Utc>) -> Result<bool> {
    let start = DateTime::parse_from_rfc3339(starts_at)
        .map_err(|e| Error::Validation(format!("invalid startsAt {starts_at}: {e}")))?
        .with_timezone(&Utc);
    let end = DateTime::parse_from_rfc3339(ends_at)
        .map_err(|e| Error::Validation(format!("invalid endsAt {ends_at}: {e}")))?
        .with_timezone(&Utc);
    Ok(start <= now && now < end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_weekly_rrule_parses() {
        assert!(validate_rrule("FREQ=WEEKLY;BYDAY=SA,SU", Some("2026-01-03T00:00:00Z")).is_ok());
    }

    #[test]
    fn garbage_rrule_fails_validation() {
        assert!(validate_rrule("NOT_A_VALID_RRULE_STRING", None).is_err());
    }

    #[test]
    fn daily_window_is_active_shortly_after_dtstart() {
        let dtstart = "2026-01-01T09:00:00Z";
        let now = DateTime::parse_from_rfc3339("2026-01-01T09:20:00Z").unwrap().with_timezone(&Utc);
        let active = is_in_maintenance_window("FREQ=DAILY;COUNT=3", Some(dtstart), 60, now).unwrap();
        assert!(active);
    }

    #[test]
    fn daily_window_is_inactive_after_duration_elapses() {
        let dtstart = "2026-01-01T09:00:00Z";
        let now = DateTime::parse_from_rfc3339("2026-01-01T10:30:00Z").unwrap().with_timezone(&Utc);
        let active = is_in_maintenance_window("FREQ=DAILY;COUNT=3", Some(dtstart), 60, now).unwrap();
        assert!(!active);
    }

    #[test]
    fn daily_window_is_inactive_before_dtstart() {
        let dtstart = "2026-01-01T09:00:00Z";
        let now = DateTime::parse_from_rfc3339("2025-12-31T09:00:00Z").unwrap().with_timezone(&Utc);
        let active = is_in_maintenance_window("FREQ=DAILY;COUNT=3", Some(dtstart), 60, now).unwrap();
        assert!(!active);
    }

    #[test]
    fn silence_is_active_inside_interval() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:30:00Z").unwrap().with_timezone(&Utc);
        assert!(is_silenced("2026-01-01T00:00:00Z", "2026-01-01T01:00:00Z", now).unwrap());
    }

    #[test]
    fn silence_end_is_exclusive() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T01:00:00Z").unwrap().with_timezone(&Utc);
        assert!(!is_silenced("2026-01-01T00:00:00Z", "2026-01-01T01:00:00Z", now).unwrap());
    }

    #[test]
    fn silence_start_is_inclusive() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        assert!(is_silenced("2026-01-01T00:00:00Z", "2026-01-01T01:00:00Z", now).unwrap());
    }

    #[test]
    fn invalid_timestamp_is_an_error_not_a_panic() {
        assert!(is_silenced("not-a-date", "2026-01-01T01:00:00Z", Utc::now()).is_err());
    }
}
