//! Timestamp normalization: from declared flavor to something comparable.
//!
//! [`resolve`] turns a [`TemporalValue`] into a [`ResolvedValue`] (a naive
//! reading for dates and floating times, an absolute instant otherwise) and
//! reports which clock governs it. Zoned values whose `TZID` is unknown go
//! through [`reinterpret_in_reference`], the single place the broken-zone
//! recovery lives.
//!
//! [`conform`] and [`conform_until`] bring RDATE, EXDATE and UNTIL values
//! into the class of the event's start so that every later comparison is
//! between like and like.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::value::{localize, TemporalValue, ZoneId};

/// The clock a resolved value lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveZone {
    /// Dates and floating times: naive arithmetic, no offsets.
    Naive,
    Utc,
    Zone(Tz),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedValue {
    Date(NaiveDate),
    Floating(NaiveDateTime),
    Instant(DateTime<Tz>),
}

impl ResolvedValue {
    /// Ordering and equality key. Only meaningful between values of the same
    /// variant, which is all the pipeline ever compares.
    pub(crate) fn key(&self) -> NaiveDateTime {
        match self {
            ResolvedValue::Date(date) => date.and_time(NaiveTime::MIN),
            ResolvedValue::Floating(local) => *local,
            ResolvedValue::Instant(instant) => instant.naive_utc(),
        }
    }

    /// The reading on the value's own clock.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            ResolvedValue::Date(date) => date.and_time(NaiveTime::MIN),
            ResolvedValue::Floating(local) => *local,
            ResolvedValue::Instant(instant) => instant.naive_local(),
        }
    }

    pub fn year(&self) -> i32 {
        self.wall_clock().year()
    }
}

/// Resolve a value against the caller's reference zone.
///
/// - `Date` and `Floating` resolve to themselves on the naive clock.
/// - `Utc` resolves to an instant on the UTC clock.
/// - `Zoned` with a known `TZID` resolves with that zone's offset rules.
/// - `Zoned` with an unknown `TZID` keeps its wall-clock reading and is
///   attributed to `reference` instead.
pub fn resolve(value: &TemporalValue, reference: Tz) -> (ResolvedValue, EffectiveZone) {
    match value {
        TemporalValue::Date(date) => (ResolvedValue::Date(*date), EffectiveZone::Naive),
        TemporalValue::Floating(local) => (ResolvedValue::Floating(*local), EffectiveZone::Naive),
        TemporalValue::Utc(local) => (
            ResolvedValue::Instant(local.and_utc().with_timezone(&chrono_tz::UTC)),
            EffectiveZone::Utc,
        ),
        TemporalValue::Zoned {
            local,
            zone: ZoneId::Known(tz),
        } => (
            ResolvedValue::Instant(localize(tz, *local)),
            EffectiveZone::Zone(*tz),
        ),
        TemporalValue::Zoned {
            local,
            zone: ZoneId::Unknown(declared),
        } => (
            ResolvedValue::Instant(reinterpret_in_reference(*local, declared, reference)),
            EffectiveZone::Zone(reference),
        ),
    }
}

/// Broken-zone recovery.
///
/// The declared `TZID` could not be found in the timezone database, so the
/// wall-clock reading is kept as-is and read as if it had been written in
/// `reference`. This is a heuristic: vendor identifiers such as
/// `/freeassociation.sourceforge.net/Tzfile/Europe/Berlin` almost always
/// denote the user's own zone.
pub fn reinterpret_in_reference(
    local: NaiveDateTime,
    declared: &str,
    reference: Tz,
) -> DateTime<Tz> {
    tracing::info!(
        tzid = declared,
        reference = reference.name(),
        "unknown TZID, reading wall-clock time in reference zone"
    );
    localize(&reference, local)
}

/// Bring `value` into the class of `anchor` (the resolved event start).
///
/// - date anchor: any value becomes its wall-clock date;
/// - floating anchor: dates take the anchor's time of day, instants are read
///   on the reference zone's wall clock;
/// - instant anchor: dates take the anchor's time of day and floating values
///   are read on the anchor's zone, instants are compared as instants.
pub(crate) fn conform(
    value: &TemporalValue,
    anchor: &ResolvedValue,
    reference: Tz,
) -> ResolvedValue {
    match anchor {
        ResolvedValue::Date(_) => ResolvedValue::Date(value.date()),
        ResolvedValue::Floating(start) => match value {
            TemporalValue::Date(date) => ResolvedValue::Floating(date.and_time(start.time())),
            TemporalValue::Floating(local) => ResolvedValue::Floating(*local),
            TemporalValue::Zoned { .. } | TemporalValue::Utc(_) => {
                let instant = instant_of(value, reference).with_timezone(&reference);
                ResolvedValue::Floating(instant.naive_local())
            }
        },
        ResolvedValue::Instant(start) => {
            let zone = start.timezone();
            match value {
                TemporalValue::Date(date) => {
                    let local = date.and_time(start.naive_local().time());
                    ResolvedValue::Instant(localize(&zone, local))
                }
                TemporalValue::Floating(local) => ResolvedValue::Instant(localize(&zone, *local)),
                TemporalValue::Zoned { .. } | TemporalValue::Utc(_) => {
                    ResolvedValue::Instant(instant_of(value, reference).with_timezone(&zone))
                }
            }
        }
    }
}

/// Like [`conform`], except that a date `UNTIL` on a timed start bounds the
/// whole day rather than the start's time of day.
pub(crate) fn conform_until(
    until: &TemporalValue,
    anchor: &ResolvedValue,
    reference: Tz,
) -> ResolvedValue {
    // Time-of-day subtraction wraps, giving 23:59:59.
    let end_of_day = |date: &NaiveDate| date.and_time(NaiveTime::MIN - Duration::seconds(1));
    match (until, anchor) {
        (TemporalValue::Date(date), ResolvedValue::Floating(_)) => {
            ResolvedValue::Floating(end_of_day(date))
        }
        (TemporalValue::Date(date), ResolvedValue::Instant(start)) => {
            ResolvedValue::Instant(localize(&start.timezone(), end_of_day(date)))
        }
        _ => conform(until, anchor, reference),
    }
}

/// The instant of a zoned or UTC value, with broken-zone recovery.
/// Dates and floating values are read in `reference`.
fn instant_of(value: &TemporalValue, reference: Tz) -> DateTime<Utc> {
    match resolve(value, reference).0 {
        ResolvedValue::Instant(instant) => instant.with_timezone(&Utc),
        ResolvedValue::Date(date) => {
            localize(&reference, date.and_time(NaiveTime::MIN)).with_timezone(&Utc)
        }
        ResolvedValue::Floating(local) => localize(&reference, local).with_timezone(&Utc),
    }
}
