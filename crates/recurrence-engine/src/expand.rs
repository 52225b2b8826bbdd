//! The expansion pipeline.
//!
//! `expand` runs normalize → sanitize → generate → exclude → materialize over
//! a single event. Every stage is pure; the only configuration is
//! [`ExpandOptions`].

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};
use crate::event::{EventDescriptor, Occurrence};
use crate::exclude::filter;
use crate::generate::generate;
use crate::ical::PropertyBag;
use crate::materialize::materialize;
use crate::normalize::resolve;
use crate::sanitize::sanitize;

/// Last year generated for rules with neither `COUNT` nor `UNTIL`.
pub const DEFAULT_HORIZON_YEAR: i32 = 2037;

/// Options for [`expand_with_options`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandOptions {
    /// Unbounded rules stop after the last candidate in this year (inclusive).
    pub horizon_year: i32,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        ExpandOptions {
            horizon_year: DEFAULT_HORIZON_YEAR,
        }
    }
}

/// Expand an event into its ordered occurrences, with default options.
///
/// # Arguments
///
/// * `descriptor` - the event's temporal properties, sanitized or not
/// * `reference` - the caller's zone; timed occurrences of zoned and UTC
///   events are expressed in it, and unknown `TZID`s are read in it
///
/// # Errors
///
/// Returns [`RecurrenceError::MalformedEvent`] if the event has no start or
/// its recurrence rule cannot be evaluated. No partial result is returned.
///
/// # Examples
///
/// ```
/// use chrono_tz::Europe::Berlin;
/// use recurrence_engine::{expand, EventDescriptor};
///
/// let event = EventDescriptor::from_vevent(
///     "DTSTART;TZID=Europe/Berlin:20130301T140000\n\
///      DTEND;TZID=Europe/Berlin:20130301T160000\n\
///      RRULE:FREQ=MONTHLY;INTERVAL=2;COUNT=6\n",
/// )
/// .unwrap();
/// let occurrences = expand(&event, Berlin).unwrap();
/// assert_eq!(occurrences.len(), 6);
/// assert_eq!(occurrences[0].start.to_string(), "TZID=Europe/Berlin:20130301T140000");
/// // Every other month, so the last one falls in January 2014.
/// assert_eq!(occurrences[5].end.to_string(), "TZID=Europe/Berlin:20140101T160000");
/// ```
pub fn expand(descriptor: &EventDescriptor, reference: Tz) -> Result<Vec<Occurrence>> {
    expand_with_options(descriptor, reference, &ExpandOptions::default())
}

/// Expand an event into its ordered occurrences.
///
/// # Errors
///
/// See [`expand`].
pub fn expand_with_options(
    descriptor: &EventDescriptor,
    reference: Tz,
    options: &ExpandOptions,
) -> Result<Vec<Occurrence>> {
    let event = sanitize(descriptor)?;
    let (start, duration) = match (&event.start, event.duration) {
        (Some(start), Some(duration)) => (start, duration),
        _ => {
            return Err(RecurrenceError::MalformedEvent(
                "event has no DTSTART".to_string(),
            ))
        }
    };

    let (anchor, zone) = resolve(start, reference);
    tracing::trace!(start = %start, ?zone, "resolved event start");

    let candidates = generate(
        &anchor,
        event.recurrence_rule.as_ref(),
        event.recurrence_dates(),
        reference,
        options.horizon_year,
    )?;
    tracing::trace!(candidates = candidates.len(), "generated candidates");

    let survivors = filter(candidates, event.exclusion_dates(), &anchor, reference);
    tracing::trace!(survivors = survivors.len(), "applied exclusions");

    materialize(&survivors, duration, reference)
}

/// Read an event from its property bag and expand it.
///
/// # Errors
///
/// See [`EventDescriptor::from_properties`] and [`expand`].
pub fn expand_properties(bag: &PropertyBag, reference: Tz) -> Result<Vec<Occurrence>> {
    expand(&EventDescriptor::from_properties(bag)?, reference)
}

/// Parse an IANA zone name supplied by the caller.
///
/// # Errors
///
/// Returns [`RecurrenceError::InvalidTimezone`] for a name the timezone
/// database does not know. Event `TZID`s never go through here; unknown ones
/// are recovered instead.
///
/// # Examples
///
/// ```
/// use recurrence_engine::{parse_reference_zone, RecurrenceError};
///
/// assert_eq!(parse_reference_zone("Europe/Berlin").unwrap(), chrono_tz::Europe::Berlin);
/// assert!(matches!(
///     parse_reference_zone("Berlin/Europe"),
///     Err(RecurrenceError::InvalidTimezone(_))
/// ));
/// ```
pub fn parse_reference_zone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| RecurrenceError::InvalidTimezone(format!("'{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use chrono_tz::Europe::Berlin;

    use crate::rule::RuleSpec;
    use crate::value::TemporalValue;

    fn ndt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_single_event_is_sanitized_pair() {
        let start = TemporalValue::zoned(ndt(2014, 8, 29, 8, 0), "Europe/Berlin");
        let end = TemporalValue::zoned(ndt(2014, 8, 29, 9, 0), "Europe/Berlin");
        let event = EventDescriptor::new(start.clone()).with_end(end.clone());
        assert_eq!(expand(&event, Berlin).unwrap(), vec![Occurrence { start, end }]);
    }

    #[test]
    fn test_missing_start_fails() {
        let err = expand(&EventDescriptor::default(), Berlin).unwrap_err();
        assert!(matches!(err, RecurrenceError::MalformedEvent(_)));
    }

    #[test]
    fn test_options_change_horizon() {
        let event = EventDescriptor::new(TemporalValue::Date(
            NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
        ))
        .with_rule(RuleSpec::parse("FREQ=YEARLY").unwrap());

        assert_eq!(expand(&event, Berlin).unwrap().len(), 18);
        let options = ExpandOptions { horizon_year: 2025 };
        assert_eq!(expand_with_options(&event, Berlin, &options).unwrap().len(), 6);
    }

    #[test]
    fn test_duration_carries_to_every_occurrence() {
        let event = EventDescriptor::new(TemporalValue::Floating(ndt(2014, 2, 3, 7, 0)))
            .with_duration(Duration::minutes(45))
            .with_rule(RuleSpec::parse("FREQ=DAILY;COUNT=3").unwrap());
        let occurrences = expand(&event, Berlin).unwrap();
        assert_eq!(occurrences.len(), 3);
        for occurrence in occurrences {
            assert_eq!(
                occurrence.end.wall_clock() - occurrence.start.wall_clock(),
                Duration::minutes(45)
            );
        }
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ExpandOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ExpandOptions::default());
        let options: ExpandOptions = serde_json::from_str(r#"{"horizon_year": 2030}"#).unwrap();
        assert_eq!(options.horizon_year, 2030);
    }

    #[test]
    fn test_parse_reference_zone() {
        assert_eq!(parse_reference_zone("Europe/Berlin").unwrap(), Berlin);
        assert_eq!(
            parse_reference_zone("Berlin/Europe").unwrap_err(),
            RecurrenceError::InvalidTimezone("'Berlin/Europe'".to_string())
        );
    }
}
