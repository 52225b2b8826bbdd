//! The four timestamp flavors of the iCalendar data model.
//!
//! Every DTSTART, DTEND, RDATE, EXDATE and UNTIL value is one of:
//!
//! - [`TemporalValue::Date`] — an all-day date, no zone
//! - [`TemporalValue::Floating`] — a wall-clock reading with no zone ("floating time")
//! - [`TemporalValue::Zoned`] — a wall-clock reading attributed to a `TZID`
//! - [`TemporalValue::Utc`] — a "Zulu" reading with a fixed zero offset
//!
//! The set is closed. Every comparison and arithmetic site matches on it
//! exhaustively.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::error::{RecurrenceError, Result};

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

// ── ZoneId ──────────────────────────────────────────────────────────────────

/// A `TZID` as declared by the event.
///
/// Calendar exports routinely carry identifiers the timezone database has
/// never heard of (`/freeassociation.sourceforge.net/Tzfile/Europe/Berlin`,
/// `Pacific Time (US & Canada), Tijuana`). Those are kept verbatim as
/// [`ZoneId::Unknown`] and recovered later by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneId {
    Known(Tz),
    Unknown(String),
}

impl ZoneId {
    /// Look a `TZID` up in the timezone database.
    pub fn from_tzid(tzid: &str) -> Self {
        let tzid = tzid.trim();
        match tzid.parse::<Tz>() {
            Ok(tz) => ZoneId::Known(tz),
            Err(_) => ZoneId::Unknown(tzid.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ZoneId::Known(tz) => tz.name(),
            ZoneId::Unknown(name) => name,
        }
    }

    pub fn known(&self) -> Option<Tz> {
        match self {
            ZoneId::Known(tz) => Some(*tz),
            ZoneId::Unknown(_) => None,
        }
    }
}

impl From<Tz> for ZoneId {
    fn from(tz: Tz) -> Self {
        ZoneId::Known(tz)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ZoneId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── ValueClass ──────────────────────────────────────────────────────────────

/// Start and end of a sanitized event always share a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueClass {
    Date,
    Timed,
}

// ── TemporalValue ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TemporalValue {
    Date(NaiveDate),
    Floating(NaiveDateTime),
    Zoned { local: NaiveDateTime, zone: ZoneId },
    Utc(NaiveDateTime),
}

impl TemporalValue {
    /// A wall-clock reading in the zone named by `tzid`, resolved or not.
    pub fn zoned(local: NaiveDateTime, tzid: &str) -> Self {
        TemporalValue::Zoned {
            local,
            zone: ZoneId::from_tzid(tzid),
        }
    }

    /// Express an instant as a wall-clock reading in `zone`.
    pub fn from_instant<T: TimeZone>(instant: &DateTime<T>, zone: Tz) -> Self {
        TemporalValue::Zoned {
            local: instant.with_timezone(&zone).naive_local(),
            zone: ZoneId::Known(zone),
        }
    }

    /// Parse an iCalendar date or date-time literal.
    ///
    /// `value_type` is the `VALUE` parameter (`DATE` / `DATE-TIME`) and `tzid`
    /// the `TZID` parameter of the property the literal came from. A `Z`
    /// suffix wins over any `TZID`; a `DATE` value ignores its `TZID`.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::MalformedEvent`] if the literal is neither
    /// `YYYYMMDD` nor `YYYYMMDDTHHMMSS[Z]`.
    pub fn parse_literal(text: &str, value_type: Option<&str>, tzid: Option<&str>) -> Result<Self> {
        let text = text.trim();
        let is_date = match value_type {
            Some(kind) if kind.eq_ignore_ascii_case("DATE") => true,
            Some(kind) if kind.eq_ignore_ascii_case("DATE-TIME") => false,
            _ => !text.contains(['T', 't']),
        };

        if is_date {
            return NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(TemporalValue::Date)
                .map_err(|e| {
                    RecurrenceError::MalformedEvent(format!("invalid date '{text}': {e}"))
                });
        }

        let (body, is_utc) = match text.strip_suffix(['Z', 'z']) {
            Some(body) => (body, true),
            None => (text, false),
        };
        let local = NaiveDateTime::parse_from_str(body, DATE_TIME_FORMAT).map_err(|e| {
            RecurrenceError::MalformedEvent(format!("invalid date-time '{text}': {e}"))
        })?;

        Ok(match (is_utc, tzid) {
            (true, _) => TemporalValue::Utc(local),
            (false, Some(tzid)) => TemporalValue::zoned(local, tzid),
            (false, None) => TemporalValue::Floating(local),
        })
    }

    pub fn class(&self) -> ValueClass {
        match self {
            TemporalValue::Date(_) => ValueClass::Date,
            TemporalValue::Floating(_) | TemporalValue::Zoned { .. } | TemporalValue::Utc(_) => {
                ValueClass::Timed
            }
        }
    }

    pub fn is_date(&self) -> bool {
        self.class() == ValueClass::Date
    }

    /// The wall-clock reading; dates read as midnight.
    pub fn wall_clock(&self) -> NaiveDateTime {
        match self {
            TemporalValue::Date(date) => date.and_time(NaiveTime::MIN),
            TemporalValue::Floating(local)
            | TemporalValue::Zoned { local, .. }
            | TemporalValue::Utc(local) => *local,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.wall_clock().date()
    }

    /// The zone whose offset rules apply, if there is one: the resolved
    /// `TZID` of a zoned value, or UTC.
    pub fn known_zone(&self) -> Option<Tz> {
        match self {
            TemporalValue::Zoned { zone, .. } => zone.known(),
            TemporalValue::Utc(_) => Some(chrono_tz::UTC),
            TemporalValue::Date(_) | TemporalValue::Floating(_) => None,
        }
    }

    /// The absolute instant for values that have one.
    ///
    /// `None` for dates, floating readings, and zoned readings whose `TZID`
    /// is unknown.
    pub fn to_zoned_datetime(&self) -> Option<DateTime<Tz>> {
        match self {
            TemporalValue::Zoned { local, zone } => zone.known().map(|tz| localize(&tz, *local)),
            TemporalValue::Utc(local) => Some(local.and_utc().with_timezone(&chrono_tz::UTC)),
            TemporalValue::Date(_) | TemporalValue::Floating(_) => None,
        }
    }

    /// Same flavor and zone, different wall-clock reading.
    pub fn with_wall_clock(&self, local: NaiveDateTime) -> Self {
        match self {
            TemporalValue::Date(_) => TemporalValue::Date(local.date()),
            TemporalValue::Floating(_) => TemporalValue::Floating(local),
            TemporalValue::Zoned { zone, .. } => TemporalValue::Zoned {
                local,
                zone: zone.clone(),
            },
            TemporalValue::Utc(_) => TemporalValue::Utc(local),
        }
    }

    /// Add `duration` while staying in this value's representation.
    ///
    /// Dates move by whole days. Values in a known zone move by elapsed time
    /// and are read back on that zone's wall clock; every other flavor moves
    /// naively. Returns `None` if the result leaves chrono's date range.
    pub fn shifted_by(&self, duration: Duration) -> Option<Self> {
        let shifted = match self {
            TemporalValue::Date(date) => {
                TemporalValue::Date(date.checked_add_signed(Duration::days(duration.num_days()))?)
            }
            TemporalValue::Floating(local) => {
                TemporalValue::Floating(local.checked_add_signed(duration)?)
            }
            TemporalValue::Utc(local) => TemporalValue::Utc(local.checked_add_signed(duration)?),
            TemporalValue::Zoned { local, zone } => {
                let local = match zone.known() {
                    Some(tz) => localize(&tz, *local)
                        .checked_add_signed(duration)?
                        .naive_local(),
                    None => local.checked_add_signed(duration)?,
                };
                TemporalValue::Zoned {
                    local,
                    zone: zone.clone(),
                }
            }
        };
        Some(shifted)
    }
}

/// Renders the iCalendar literal, prefixed with `TZID=...:` for zoned values.
/// A `TZID` containing `:`, `;` or `,` is written as a quoted string.
impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalValue::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            TemporalValue::Floating(local) => write!(f, "{}", local.format(DATE_TIME_FORMAT)),
            TemporalValue::Zoned { local, zone } => {
                let zone = zone.as_str();
                if zone.contains([':', ';', ',']) {
                    write!(f, "TZID=\"{zone}\":{}", local.format(DATE_TIME_FORMAT))
                } else {
                    write!(f, "TZID={zone}:{}", local.format(DATE_TIME_FORMAT))
                }
            }
            TemporalValue::Utc(local) => write!(f, "{}Z", local.format(DATE_TIME_FORMAT)),
        }
    }
}

/// Attach `tz` to a wall-clock reading.
///
/// Ambiguous readings (DST fall-back) take the earlier instant. Readings in a
/// DST gap are moved forward by the width of a typical gap.
pub(crate) fn localize(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            local
                .checked_add_signed(Duration::hours(1))
                .and_then(|later| tz.from_local_datetime(&later).earliest())
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&local))
}
