//! Event descriptors (input) and occurrences (output).

use chrono::Duration;
use serde::Serialize;

use crate::rule::RuleSpec;
use crate::value::TemporalValue;

/// The temporal properties of one event, as read from its property bag.
///
/// `start` is optional because a raw event can lack `DTSTART`; sanitizing
/// such an event fails. Recurrence and exclusion dates have set semantics:
/// adding a value that is already present is a no-op, so multiple `RDATE` /
/// `EXDATE` lines and comma-separated lists flatten into one collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventDescriptor {
    pub start: Option<TemporalValue>,
    pub end: Option<TemporalValue>,
    pub duration: Option<Duration>,
    pub recurrence_rule: Option<RuleSpec>,
    recurrence_dates: Vec<TemporalValue>,
    exclusion_dates: Vec<TemporalValue>,
}

impl EventDescriptor {
    pub fn new(start: TemporalValue) -> Self {
        EventDescriptor {
            start: Some(start),
            ..Default::default()
        }
    }

    pub fn with_end(mut self, end: TemporalValue) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_rule(mut self, rule: RuleSpec) -> Self {
        self.recurrence_rule = Some(rule);
        self
    }

    pub fn with_recurrence_date(mut self, value: TemporalValue) -> Self {
        self.add_recurrence_date(value);
        self
    }

    pub fn with_exclusion_date(mut self, value: TemporalValue) -> Self {
        self.add_exclusion_date(value);
        self
    }

    pub fn add_recurrence_date(&mut self, value: TemporalValue) {
        if !self.recurrence_dates.contains(&value) {
            self.recurrence_dates.push(value);
        }
    }

    pub fn add_exclusion_date(&mut self, value: TemporalValue) {
        if !self.exclusion_dates.contains(&value) {
            self.exclusion_dates.push(value);
        }
    }

    pub fn recurrence_dates(&self) -> &[TemporalValue] {
        &self.recurrence_dates
    }

    pub fn exclusion_dates(&self) -> &[TemporalValue] {
        &self.exclusion_dates
    }
}

/// One concrete instance of an event.
///
/// `start` and `end` share a class. Timed occurrences of zoned or UTC events
/// are expressed in the caller's reference zone; floating occurrences stay
/// floating and all-day occurrences stay dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub start: TemporalValue,
    pub end: TemporalValue,
}
