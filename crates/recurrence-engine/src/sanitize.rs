//! Interval sanitizing: turn a raw start / end / duration triple into a
//! complete, class-consistent one.

use chrono::{DateTime, Duration, NaiveTime};
use chrono_tz::Tz;

use crate::error::{RecurrenceError, Result};
use crate::event::EventDescriptor;
use crate::value::{localize, TemporalValue, ValueClass};

/// Repair an event's start / end / duration.
///
/// Repairs, in order:
///
/// 1. no end and no duration: the end is the start, one day later for
///    all-day events (an all-day event spans its own day, end-exclusive);
/// 2. no end but a duration: the end is start + duration in the start's
///    representation;
/// 3. an end of the other class (date vs. date-time) is coerced to the
///    start's class, keeping its wall-clock fields;
/// 4. the duration is re-derived as end − start.
///
/// The result always carries start, end and duration, so sanitizing it again
/// changes nothing. Recurrence data is passed through untouched.
///
/// # Errors
///
/// Returns [`RecurrenceError::MalformedEvent`] if the event has no start, or
/// if its duration carries the end out of the representable date range.
///
/// # Examples
///
/// ```
/// use recurrence_engine::{format_duration, sanitize, EventDescriptor};
///
/// let event = EventDescriptor::from_vevent("DTSTART;VALUE=DATE:20140829\n").unwrap();
/// let event = sanitize(&event).unwrap();
/// // An all-day event with no end covers its own day.
/// assert_eq!(event.end.unwrap().to_string(), "20140830");
/// assert_eq!(event.duration.map(format_duration).as_deref(), Some("P1D"));
/// ```
pub fn sanitize(descriptor: &EventDescriptor) -> Result<EventDescriptor> {
    let start = descriptor
        .start
        .clone()
        .ok_or_else(|| RecurrenceError::MalformedEvent("event has no DTSTART".to_string()))?;

    let end = match (&descriptor.end, descriptor.duration) {
        (Some(end), _) => coerce_class(end, &start)?,
        (None, Some(duration)) => shift(&start, duration)?,
        (None, None) if start.is_date() => shift(&start, Duration::days(1))?,
        (None, None) => start.clone(),
    };

    let duration = difference(&start, &end);

    let mut sanitized = descriptor.clone();
    sanitized.start = Some(start);
    sanitized.end = Some(end);
    sanitized.duration = Some(duration);
    Ok(sanitized)
}

/// Make `end` the same class as `start`.
fn coerce_class(end: &TemporalValue, start: &TemporalValue) -> Result<TemporalValue> {
    match (start.class(), end.class()) {
        (ValueClass::Date, ValueClass::Timed) => {
            let date = end.date();
            if date > start.date() {
                Ok(TemporalValue::Date(date))
            } else {
                shift(start, Duration::days(1))
            }
        }
        (ValueClass::Timed, ValueClass::Date) => {
            Ok(start.with_wall_clock(end.date().and_time(NaiveTime::MIN)))
        }
        (ValueClass::Date, ValueClass::Date) | (ValueClass::Timed, ValueClass::Timed) => {
            Ok(end.clone())
        }
    }
}

fn shift(start: &TemporalValue, duration: Duration) -> Result<TemporalValue> {
    start.shifted_by(duration).ok_or_else(|| {
        RecurrenceError::MalformedEvent(format!("end of {start} is out of range"))
    })
}

/// `end - start`: naive for two dates or two floating readings, elapsed time
/// otherwise. A side without a known zone is read in the other side's zone,
/// or in UTC if neither has one.
fn difference(start: &TemporalValue, end: &TemporalValue) -> Duration {
    match (start, end) {
        (TemporalValue::Date(s), TemporalValue::Date(e)) => e.signed_duration_since(*s),
        (TemporalValue::Floating(s), TemporalValue::Floating(e)) => e.signed_duration_since(*s),
        _ => {
            let zone = start
                .known_zone()
                .or_else(|| end.known_zone())
                .unwrap_or(chrono_tz::UTC);
            instant_in(end, zone).signed_duration_since(instant_in(start, zone))
        }
    }
}

fn instant_in(value: &TemporalValue, zone: Tz) -> DateTime<Tz> {
    value
        .to_zoned_datetime()
        .unwrap_or_else(|| localize(&zone, value.wall_clock()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::rule::RuleSpec;

    fn ndt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> TemporalValue {
        TemporalValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_missing_start_is_malformed() {
        let err = sanitize(&EventDescriptor::default()).unwrap_err();
        assert_eq!(
            err,
            RecurrenceError::MalformedEvent("event has no DTSTART".to_string())
        );
    }

    #[test]
    fn test_noend_date_spans_one_day() {
        let event = sanitize(&EventDescriptor::new(date(2014, 8, 29))).unwrap();
        assert_eq!(event.start, Some(date(2014, 8, 29)));
        assert_eq!(event.end, Some(date(2014, 8, 30)));
        assert_eq!(event.duration, Some(Duration::days(1)));
    }

    #[test]
    fn test_noend_datetime_has_zero_duration() {
        let start = TemporalValue::zoned(ndt(2014, 8, 29, 8, 0), "Europe/Berlin");
        let event = sanitize(&EventDescriptor::new(start.clone())).unwrap();
        assert_eq!(event.end, Some(start));
        assert_eq!(event.duration, Some(Duration::zero()));
    }

    #[test]
    fn test_duration_fills_end() {
        let event = sanitize(
            &EventDescriptor::new(date(2014, 1, 10)).with_duration(Duration::days(1)),
        )
        .unwrap();
        assert_eq!(event.end, Some(date(2014, 1, 11)));

        let event = sanitize(
            &EventDescriptor::new(TemporalValue::Floating(ndt(2014, 2, 3, 7, 0)))
                .with_duration(Duration::minutes(90)),
        )
        .unwrap();
        assert_eq!(
            event.end,
            Some(TemporalValue::Floating(ndt(2014, 2, 3, 8, 30)))
        );
    }

    #[test]
    fn test_duration_past_date_range_is_malformed() {
        let err = sanitize(
            &EventDescriptor::new(date(2013, 3, 1)).with_duration(Duration::weeks(99_999_999)),
        )
        .unwrap_err();
        assert!(matches!(err, RecurrenceError::MalformedEvent(_)));
    }

    #[test]
    fn test_end_wins_over_duration() {
        let start = TemporalValue::Utc(ndt(2013, 3, 1, 14, 0));
        let end = TemporalValue::Utc(ndt(2013, 3, 1, 16, 0));
        let event = sanitize(
            &EventDescriptor::new(start)
                .with_end(end.clone())
                .with_duration(Duration::hours(5)),
        )
        .unwrap();
        assert_eq!(event.end, Some(end));
        assert_eq!(event.duration, Some(Duration::hours(2)));
    }

    #[test]
    fn test_timed_end_on_date_start_becomes_date() {
        let event = sanitize(
            &EventDescriptor::new(date(2013, 3, 1))
                .with_end(TemporalValue::Floating(ndt(2013, 3, 3, 0, 0))),
        )
        .unwrap();
        assert_eq!(event.end, Some(date(2013, 3, 3)));
        assert_eq!(event.duration, Some(Duration::days(2)));
    }

    #[test]
    fn test_same_day_timed_end_on_date_start_keeps_one_day() {
        let event = sanitize(
            &EventDescriptor::new(date(2013, 3, 1))
                .with_end(TemporalValue::Utc(ndt(2013, 3, 1, 12, 0))),
        )
        .unwrap();
        assert_eq!(event.end, Some(date(2013, 3, 2)));
    }

    #[test]
    fn test_date_end_on_timed_start_becomes_midnight_in_start_flavor() {
        let start = TemporalValue::zoned(ndt(2013, 3, 1, 14, 0), "Europe/Berlin");
        let event = sanitize(&EventDescriptor::new(start).with_end(date(2013, 3, 2))).unwrap();
        assert_eq!(
            event.end,
            Some(TemporalValue::zoned(ndt(2013, 3, 2, 0, 0), "Europe/Berlin"))
        );
        assert_eq!(event.duration, Some(Duration::hours(10)));
    }

    #[test]
    fn test_duration_is_elapsed_time_across_zones() {
        // 14:00 Berlin (13:00 UTC) until 16:00 UTC = 3 hours.
        let event = sanitize(
            &EventDescriptor::new(TemporalValue::zoned(ndt(2013, 3, 1, 14, 0), "Europe/Berlin"))
                .with_end(TemporalValue::Utc(ndt(2013, 3, 1, 16, 0))),
        )
        .unwrap();
        assert_eq!(event.duration, Some(Duration::hours(3)));
    }

    #[test]
    fn test_duration_with_broken_zone_is_wall_clock() {
        let tzid = "/freeassociation.sourceforge.net/Tzfile/Europe/Berlin";
        let event = sanitize(
            &EventDescriptor::new(TemporalValue::zoned(ndt(2013, 3, 1, 14, 0), tzid))
                .with_end(TemporalValue::zoned(ndt(2013, 3, 1, 16, 0), tzid)),
        )
        .unwrap();
        assert_eq!(event.duration, Some(Duration::hours(2)));
    }

    #[test]
    fn test_sanitize_is_idempotent_and_keeps_recurrence() {
        let raw = EventDescriptor::new(date(2009, 10, 31))
            .with_rule(RuleSpec::parse("FREQ=YEARLY;BYMONTHDAY=31;BYMONTH=10").unwrap())
            .with_exclusion_date(date(2010, 10, 31));
        let once = sanitize(&raw).unwrap();
        let twice = sanitize(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.recurrence_rule, raw.recurrence_rule);
        assert_eq!(once.exclusion_dates(), raw.exclusion_dates());
    }
}
