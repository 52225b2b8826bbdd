//! # recurrence-engine
//!
//! Deterministic occurrence expansion for iCalendar events.
//!
//! Given one event's DTSTART, DTEND or DURATION, RRULE, RDATE and EXDATE
//! properties and a reference timezone, the engine produces the complete,
//! ordered, deduplicated list of concrete `(start, end)` occurrences. It
//! reconciles floating, zoned and UTC timestamps, and recovers events whose
//! `TZID` the timezone database does not know.
//!
//! ## Modules
//!
//! - [`value`] — the four timestamp flavors and their iCalendar literals
//! - [`duration`] — ISO 8601 `DURATION` literals
//! - [`rule`] — `RRULE` values
//! - [`event`] — event descriptors (input) and occurrences (output)
//! - [`ical`] — content lines and property bags
//! - [`normalize`] — timestamp resolution and broken-zone recovery
//! - [`sanitize`] — start / end / duration repair
//! - [`generate`] — RRULE ∪ RDATE candidate generation
//! - [`exclude`] — EXDATE filtering
//! - [`materialize`] — candidates to occurrences
//! - [`expand`] — the full pipeline
//! - [`error`] — Error types

pub mod duration;
pub mod error;
pub mod event;
pub mod exclude;
pub mod expand;
pub mod generate;
pub mod ical;
pub mod materialize;
pub mod normalize;
pub mod rule;
pub mod sanitize;
pub mod value;

pub use duration::{format_duration, parse_duration};
pub use error::{RecurrenceError, Result};
pub use event::{EventDescriptor, Occurrence};
pub use expand::{
    expand, expand_properties, expand_with_options, parse_reference_zone, ExpandOptions,
    DEFAULT_HORIZON_YEAR,
};
pub use ical::{Property, PropertyBag};
pub use normalize::{reinterpret_in_reference, resolve, EffectiveZone, ResolvedValue};
pub use rule::{Frequency, RuleSpec};
pub use sanitize::sanitize;
pub use value::{TemporalValue, ValueClass, ZoneId};
