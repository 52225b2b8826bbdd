//! Property bags: the view of an event the engine consumes.
//!
//! This is not a full iCalendar parser. It unfolds content lines, splits them
//! into name / parameters / value, and groups the properties of one `VEVENT`
//! by name. Everything else about the file (other components, `VTIMEZONE`
//! definitions, alarms) is skipped.

use crate::duration::parse_duration;
use crate::error::{RecurrenceError, Result};
use crate::event::EventDescriptor;
use crate::rule::RuleSpec;
use crate::value::TemporalValue;

/// Components whose properties never belong to the event itself.
const SKIPPED_COMPONENTS: &[&str] = &["VTIMEZONE", "STANDARD", "DAYLIGHT", "VALARM"];

// ── Property ────────────────────────────────────────────────────────────────

/// One unfolded content line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Upper-cased.
    pub name: String,
    /// `(NAME, value)` pairs in line order; names upper-cased, quotes removed.
    pub params: Vec<(String, String)>,
    pub value: String,
}

impl Property {
    /// Split `NAME;PARAM=a;PARAM="quoted;value":VALUE`.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidContentLine`] if the line has no
    /// name, no unquoted `:`, or a parameter without `=`.
    pub fn parse(line: &str) -> Result<Self> {
        let invalid = |why: &str| RecurrenceError::InvalidContentLine(format!("{why}: '{line}'"));

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut value = None;

        for (idx, ch) in line.char_indices() {
            match ch {
                '"' => in_quotes = !in_quotes,
                ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
                ':' if !in_quotes => {
                    segments.push(std::mem::take(&mut current));
                    value = Some(&line[idx + 1..]);
                    break;
                }
                _ => current.push(ch),
            }
        }

        let value = value.ok_or_else(|| invalid("missing ':'"))?;
        let mut segments = segments.into_iter();
        let name = segments
            .next()
            .map(|name| name.trim().to_ascii_uppercase())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| invalid("missing property name"))?;

        let params = segments
            .map(|segment| {
                segment
                    .split_once('=')
                    .map(|(key, val)| (key.trim().to_ascii_uppercase(), val.to_string()))
                    .ok_or_else(|| invalid("parameter without '='"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Property {
            name,
            params,
            value: value.to_string(),
        })
    }

    /// First value of parameter `name` (case-insensitive).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parse every comma-separated literal of this property, sharing its
    /// `VALUE` and `TZID` parameters. `PERIOD` values contribute their start.
    fn temporal_values(&self) -> Result<Vec<TemporalValue>> {
        let value_type = self.param("VALUE");
        let tzid = self.param("TZID");
        self.value
            .split(',')
            .map(str::trim)
            .filter(|literal| !literal.is_empty())
            .map(|literal| {
                let literal = literal.split_once('/').map_or(literal, |(start, _)| start);
                let value_type = value_type.filter(|kind| !kind.eq_ignore_ascii_case("PERIOD"));
                TemporalValue::parse_literal(literal, value_type, tzid)
            })
            .collect()
    }
}

// ── PropertyBag ─────────────────────────────────────────────────────────────

/// Ordered multimap of an event's properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBag {
    properties: Vec<Property>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// The first property called `name`.
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.get_all(name).next()
    }

    /// Every property called `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Property> + 'a {
        let name = name.to_string();
        self.properties
            .iter()
            .filter(move |property| property.name.eq_ignore_ascii_case(&name))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Collect the properties of the first `VEVENT` in `text`.
    ///
    /// Folded lines are unfolded first. Nested components inside the event
    /// (alarms) are skipped. A text without `BEGIN:VEVENT` is read as a bare
    /// list of event properties, minus any timezone or alarm components.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::InvalidContentLine`] for a line that cannot
    /// be split into name, parameters and value.
    pub fn from_vevent(text: &str) -> Result<Self> {
        let lines = unfold(text);
        let has_vevent = lines.iter().any(|line| is_marker(line, "BEGIN", "VEVENT"));

        let mut bag = PropertyBag::new();
        let mut in_event = false;
        let mut skip_depth = 0usize;

        for line in &lines {
            if let Some(component) = marker(line, "BEGIN") {
                if skip_depth > 0 || (has_vevent && in_event) {
                    skip_depth += 1;
                } else if has_vevent {
                    in_event = component == "VEVENT";
                } else if SKIPPED_COMPONENTS.contains(&component.as_str()) {
                    skip_depth = 1;
                }
                continue;
            }
            if marker(line, "END").is_some() {
                if skip_depth > 0 {
                    skip_depth -= 1;
                } else if in_event {
                    break;
                }
                continue;
            }
            if skip_depth == 0 && (in_event || !has_vevent) {
                bag.push(Property::parse(line)?);
            }
        }

        Ok(bag)
    }
}

impl FromIterator<Property> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        PropertyBag {
            properties: iter.into_iter().collect(),
        }
    }
}

/// RFC 5545 §3.1: a line starting with a space or tab continues the previous one.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end_matches('\r');
        if let Some(continuation) = raw.strip_prefix([' ', '\t']) {
            if let Some(previous) = lines.last_mut() {
                previous.push_str(continuation);
                continue;
            }
        }
        if !raw.trim().is_empty() {
            lines.push(raw.trim_start().to_string());
        }
    }
    lines
}

/// `BEGIN:X` / `END:X` → upper-cased `X`.
fn marker(line: &str, keyword: &str) -> Option<String> {
    let (name, value) = line.split_once(':')?;
    name.trim()
        .eq_ignore_ascii_case(keyword)
        .then(|| value.trim().to_ascii_uppercase())
}

fn is_marker(line: &str, keyword: &str, component: &str) -> bool {
    marker(line, keyword).is_some_and(|found| found == component)
}

// ── EventDescriptor adapter ─────────────────────────────────────────────────

impl EventDescriptor {
    /// Read the temporal properties of an event.
    ///
    /// Only the first `RRULE` is used. Every `RDATE` / `EXDATE` line
    /// contributes all of its comma-separated values.
    ///
    /// # Errors
    ///
    /// Returns [`RecurrenceError::MalformedEvent`] if a temporal literal,
    /// the duration or the rule cannot be parsed. A missing `DTSTART` is not
    /// an error here; [`crate::sanitize`] rejects it.
    pub fn from_properties(bag: &PropertyBag) -> Result<Self> {
        let mut descriptor = EventDescriptor::default();
        descriptor.start = bag.get("DTSTART").map(single_value).transpose()?;
        descriptor.end = bag.get("DTEND").map(single_value).transpose()?;
        descriptor.duration = bag
            .get("DURATION")
            .map(|property| parse_duration(&property.value))
            .transpose()?;

        let mut rules = bag.get_all("RRULE");
        if let Some(first) = rules.next() {
            descriptor.recurrence_rule = Some(RuleSpec::parse(&first.value)?);
        }
        let ignored = rules.count();
        if ignored > 0 {
            tracing::warn!(ignored, "event has more than one RRULE, using the first");
        }

        for property in bag.get_all("RDATE") {
            for value in property.temporal_values()? {
                descriptor.add_recurrence_date(value);
            }
        }
        for property in bag.get_all("EXDATE") {
            for value in property.temporal_values()? {
                descriptor.add_exclusion_date(value);
            }
        }

        Ok(descriptor)
    }

    /// Parse `text` as a `VEVENT` and read its temporal properties.
    ///
    /// # Errors
    ///
    /// See [`PropertyBag::from_vevent`] and [`EventDescriptor::from_properties`].
    pub fn from_vevent(text: &str) -> Result<Self> {
        Self::from_properties(&PropertyBag::from_vevent(text)?)
    }
}

fn single_value(property: &Property) -> Result<TemporalValue> {
    TemporalValue::parse_literal(&property.value, property.param("VALUE"), property.param("TZID"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn ndt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    // ── Property::parse ─────────────────────────────────────────────────

    #[test]
    fn test_parse_plain_property() {
        let property = Property::parse("RRULE:FREQ=MONTHLY;INTERVAL=2;COUNT=6").unwrap();
        assert_eq!(property.name, "RRULE");
        assert!(property.params.is_empty());
        assert_eq!(property.value, "FREQ=MONTHLY;INTERVAL=2;COUNT=6");
    }

    #[test]
    fn test_parse_params_case_insensitive() {
        let property = Property::parse("dtstart;tzid=Europe/Berlin:20130301T140000").unwrap();
        assert_eq!(property.name, "DTSTART");
        assert_eq!(property.param("TZID"), Some("Europe/Berlin"));
        assert_eq!(property.param("tzid"), Some("Europe/Berlin"));
        assert_eq!(property.value, "20130301T140000");
    }

    #[test]
    fn test_parse_quoted_param_value() {
        let property =
            Property::parse("DTSTART;TZID=\"Pacific Time (US & Canada), Tijuana\":20120726T130000")
                .unwrap();
        assert_eq!(
            property.param("TZID"),
            Some("Pacific Time (US & Canada), Tijuana")
        );
        assert_eq!(property.value, "20120726T130000");

        let property = Property::parse("X-THING;X-P=\"a;b:c\":value:with:colons").unwrap();
        assert_eq!(property.param("X-P"), Some("a;b:c"));
        assert_eq!(property.value, "value:with:colons");
    }

    #[test]
    fn test_parse_invalid_lines() {
        for bad in ["NOCOLON", ":20130301", "DTSTART;TZID:x"] {
            let err = Property::parse(bad).unwrap_err();
            assert!(
                matches!(err, RecurrenceError::InvalidContentLine(_)),
                "{bad:?} gave {err:?}"
            );
        }
    }

    // ── PropertyBag::from_vevent ────────────────────────────────────────

    const WITH_TIMEZONE: &str = "BEGIN:VCALENDAR\r
BEGIN:VTIMEZONE\r
TZID:Europe/Berlin\r
BEGIN:STANDARD\r
DTSTART:19701025T030000\r
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU\r
END:STANDARD\r
END:VTIMEZONE\r
BEGIN:VEVENT\r
DTSTART;TZID=Europe/Berlin:20130301T140000\r
DTEND;TZID=Europe/Berlin:20130301T160000\r
RRULE:FREQ=MONTHLY;INTE\r
 RVAL=2;COUNT=6\r
BEGIN:VALARM\r
TRIGGER:-PT15M\r
DURATION:PT5M\r
END:VALARM\r
END:VEVENT\r
BEGIN:VEVENT\r
DTSTART:20200101T000000\r
END:VEVENT\r
END:VCALENDAR\r
";

    #[test]
    fn test_rendered_zoned_value_reads_back() {
        let local = NaiveDate::from_ymd_opt(2012, 7, 26)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();
        for tzid in ["Pacific Time (US & Canada), Tijuana", "X;odd:zone", "Europe/Berlin"] {
            let value = TemporalValue::zoned(local, tzid);
            let property = Property::parse(&format!("DTSTART;{value}")).unwrap();
            assert_eq!(property.param("TZID"), Some(tzid));
            assert_eq!(single_value(&property).unwrap(), value);
        }
    }

    #[test]
    fn test_from_vevent_takes_first_event_only() {
        let bag = PropertyBag::from_vevent(WITH_TIMEZONE).unwrap();
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.get("DTSTART").unwrap().value, "20130301T140000");
        assert!(bag.get("DURATION").is_none());
        assert!(bag.get("TRIGGER").is_none());
    }

    #[test]
    fn test_lookup_outlives_name() {
        let bag = PropertyBag::from_vevent(WITH_TIMEZONE).unwrap();
        let found = {
            let name = String::from("dtend");
            bag.get(&name)
        };
        assert_eq!(found.unwrap().value, "20130301T160000");

        let rules: Vec<_> = {
            let name = String::from("RRULE");
            bag.get_all(&name).collect()
        };
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_from_vevent_unfolds_lines() {
        let bag = PropertyBag::from_vevent(WITH_TIMEZONE).unwrap();
        assert_eq!(
            bag.get("RRULE").unwrap().value,
            "FREQ=MONTHLY;INTERVAL=2;COUNT=6"
        );
    }

    #[test]
    fn test_bare_property_list() {
        let bag = PropertyBag::from_vevent(
            "DTSTART;VALUE=DATE:19650423\nDURATION:P1D\nRRULE:FREQ=YEARLY\n",
        )
        .unwrap();
        assert_eq!(bag.len(), 3);
    }

    #[test]
    fn test_misspelled_component_is_read_as_bare_list() {
        let text = "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:EVENT\nDTSTART;VALUE=DATE:19650423\n\
                    DURATION:P1D\nRRULE:FREQ=YEARLY\nEND:VEVENT\nEND:VCALENDAR\n";
        let bag = PropertyBag::from_vevent(text).unwrap();
        assert!(bag.get("DTSTART").is_some());
        assert_eq!(bag.get("DURATION").unwrap().value, "P1D");
    }

    // ── EventDescriptor::from_properties ────────────────────────────────

    #[test]
    fn test_descriptor_from_vevent() {
        let event = EventDescriptor::from_vevent(WITH_TIMEZONE).unwrap();
        assert_eq!(
            event.start,
            Some(TemporalValue::zoned(ndt(2013, 3, 1, 14, 0), "Europe/Berlin"))
        );
        assert_eq!(
            event.end,
            Some(TemporalValue::zoned(ndt(2013, 3, 1, 16, 0), "Europe/Berlin"))
        );
        assert_eq!(event.recurrence_rule.unwrap().count, Some(6));
    }

    #[test]
    fn test_date_value_ignores_tzid() {
        let text = "DTSTART;VALUE=DATE;TZID=Berlin/Europe:20130301\n";
        let event = EventDescriptor::from_vevent(text).unwrap();
        assert_eq!(
            event.start,
            Some(TemporalValue::Date(NaiveDate::from_ymd_opt(2013, 3, 1).unwrap()))
        );
    }

    #[test]
    fn test_exdate_lists_are_flattened() {
        let event = EventDescriptor::from_vevent(
            "DTSTART;TZID=Europe/Berlin:20140702T190000\n\
             RRULE:FREQ=DAILY;COUNT=10\n\
             EXDATE;TZID=Europe/Berlin:20140703T190000\n\
             EXDATE;TZID=Europe/Berlin:20140705T190000,20140707T190000\n\
             EXDATE;TZID=Europe/Berlin:20140703T190000\n",
        )
        .unwrap();
        assert_eq!(event.exclusion_dates().len(), 3);
        assert_eq!(
            event.exclusion_dates()[2],
            TemporalValue::zoned(ndt(2014, 7, 7, 19, 0), "Europe/Berlin")
        );
    }

    #[test]
    fn test_rdate_period_uses_start() {
        let event = EventDescriptor::from_vevent(
            "DTSTART:20130301T140000Z\n\
             RDATE;VALUE=PERIOD:20130401T140000Z/PT1H,20130501T140000Z/20130501T150000Z\n",
        )
        .unwrap();
        assert_eq!(
            event.recurrence_dates(),
            &[
                TemporalValue::Utc(ndt(2013, 4, 1, 14, 0)),
                TemporalValue::Utc(ndt(2013, 5, 1, 14, 0)),
            ]
        );
    }

    #[test]
    fn test_extra_rrules_are_ignored() {
        let event = EventDescriptor::from_vevent(
            "DTSTART:20130301T140000\nRRULE:FREQ=DAILY;COUNT=2\nRRULE:FREQ=WEEKLY;COUNT=9\n",
        )
        .unwrap();
        assert_eq!(event.recurrence_rule.unwrap().count, Some(2));
    }

    #[test]
    fn test_duration_and_missing_start() {
        let bag = PropertyBag::from_vevent("DURATION:PT1H30M\nSUMMARY:no start\n").unwrap();
        let event = EventDescriptor::from_properties(&bag).unwrap();
        assert!(event.start.is_none());
        assert_eq!(event.duration, Some(Duration::minutes(90)));
    }

    #[test]
    fn test_bad_literal_is_malformed() {
        let err = EventDescriptor::from_vevent("DTSTART:2013-03-01\n").unwrap_err();
        assert!(matches!(err, RecurrenceError::MalformedEvent(_)));
    }
}
