//! `RRULE` values.
//!
//! A [`RuleSpec`] keeps the parts of a recurrence rule this engine needs to
//! reason about itself (`FREQ`, `INTERVAL`, `COUNT`, `UNTIL`) as typed
//! fields and carries every other part (`BYDAY`, `BYMONTH`, `BYSETPOS`,
//! `WKST`, ...) through verbatim to the rule evaluator.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{RecurrenceError, Result};
use crate::value::TemporalValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SECONDLY" => Ok(Frequency::Secondly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(RecurrenceError::MalformedEvent(format!(
                "unknown recurrence frequency '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSpec {
    pub frequency: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    /// May be a different flavor than the event's start (a UTC `UNTIL` on a
    /// floating start is common); the generator reconciles the two.
    pub until: Option<TemporalValue>,
    /// Remaining `KEY=VALUE` parts in declaration order, keys upper-cased.
    pub by_rules: Vec<(String, String)>,
}

impl RuleSpec {
    pub fn new(frequency: Frequency) -> Self {
        RuleSpec {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_rules: Vec::new(),
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_until(mut self, until: TemporalValue) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_by_rule(mut self, key: &str, value: &str) -> Self {
        self.by_rules
            .push((key.to_ascii_uppercase(), value.to_string()));
        self
    }

    /// Parse the value of an `RRULE` property. A leading `RRULE:` is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::MalformedEvent`] if `FREQ` is missing or
    /// unknown, a part is not `KEY=VALUE`, `INTERVAL`/`COUNT` are not positive
    /// integers, or `UNTIL` is not a date / date-time literal.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let body = text
            .get(..6)
            .filter(|prefix| prefix.eq_ignore_ascii_case("RRULE:"))
            .map_or(text, |_| &text[6..]);

        let mut frequency = None;
        let mut interval = 1;
        let mut count = None;
        let mut until = None;
        let mut by_rules = Vec::new();

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                RecurrenceError::MalformedEvent(format!("recurrence rule part '{part}' has no '='"))
            })?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();

            match key.as_str() {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => interval = parse_positive(&key, value)?,
                "COUNT" => count = Some(parse_positive(&key, value)?),
                "UNTIL" => until = Some(TemporalValue::parse_literal(value, None, None)?),
                _ => by_rules.push((key, value.to_string())),
            }
        }

        let frequency = frequency.ok_or_else(|| {
            RecurrenceError::MalformedEvent(format!("recurrence rule '{text}' has no FREQ"))
        })?;

        Ok(RuleSpec {
            frequency,
            interval,
            count,
            until,
            by_rules,
        })
    }

    /// Neither `COUNT` nor `UNTIL`: generation is cut at the horizon.
    pub fn is_unbounded(&self) -> bool {
        self.count.is_none() && self.until.is_none()
    }

    /// The rule as handed to the evaluator. `UNTIL` is left out because the
    /// generator applies it after reconciling its flavor with the start.
    pub(crate) fn evaluator_text(&self) -> String {
        self.render(false)
    }

    fn render(&self, with_until: bool) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency.as_str())];
        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }
        if with_until {
            if let Some(until) = &self.until {
                // Zoned UNTIL is not valid RRULE syntax; the wall-clock reading is kept.
                let literal = match until {
                    TemporalValue::Zoned { local, .. } => {
                        TemporalValue::Floating(*local).to_string()
                    }
                    other => other.to_string(),
                };
                parts.push(format!("UNTIL={literal}"));
            }
        }
        parts.extend(self.by_rules.iter().map(|(k, v)| format!("{k}={v}")));
        parts.join(";")
    }
}

impl FromStr for RuleSpec {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self> {
        RuleSpec::parse(s)
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RecurrenceError::MalformedEvent(format!(
            "recurrence rule {key} must be a positive integer, got '{value}'"
        ))),
    }
}
