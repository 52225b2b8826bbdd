//! Candidate generation: RRULE instances ∪ RDATEs, sorted and deduplicated.
//!
//! Rule evaluation is delegated to the `rrule` crate. The evaluator runs on
//! the start's own clock: the start's zone for zoned values (so a 14:00
//! meeting stays at 14:00 across DST changes), and a naive clock, modeled as
//! UTC, for dates and floating times.
//!
//! `UNTIL` is applied here rather than by the evaluator, after it has been
//! brought into the start's class. Rules with neither `COUNT` nor `UNTIL`
//! stop at the horizon year.

use chrono::DateTime;
use chrono_tz::Tz;
use rrule::{RRule, Unvalidated};

use crate::error::{RecurrenceError, Result};
use crate::normalize::{conform, conform_until, ResolvedValue};
use crate::rule::RuleSpec;
use crate::value::TemporalValue;

/// Produce the ascending, deduplicated candidate starts of an event.
///
/// # Arguments
///
/// * `start` - the resolved event start
/// * `rule` - the recurrence rule, if any
/// * `explicit_dates` - RDATE values, in any flavor
/// * `reference` - the caller's zone, used to read UTC and broken-zone RDATEs
///   against floating starts
/// * `horizon_year` - last year generated for rules without COUNT or UNTIL
///
/// # Errors
///
/// Returns [`RecurrenceError::MalformedEvent`] if the evaluator rejects the
/// rule.
pub fn generate(
    start: &ResolvedValue,
    rule: Option<&RuleSpec>,
    explicit_dates: &[TemporalValue],
    reference: Tz,
    horizon_year: i32,
) -> Result<Vec<ResolvedValue>> {
    let mut candidates = match rule {
        Some(rule) => evaluate_rule(start, rule, reference, horizon_year)?,
        None => vec![*start],
    };

    candidates.extend(
        explicit_dates
            .iter()
            .map(|value| conform(value, start, reference)),
    );
    candidates.sort_by_key(ResolvedValue::key);
    candidates.dedup_by_key(|candidate| candidate.key());

    Ok(candidates)
}

fn evaluate_rule(
    start: &ResolvedValue,
    rule: &RuleSpec,
    reference: Tz,
    horizon_year: i32,
) -> Result<Vec<ResolvedValue>> {
    let rrule_set = rule
        .evaluator_text()
        .parse::<RRule<Unvalidated>>()
        .map_err(|err| {
            RecurrenceError::MalformedEvent(format!("unsupported recurrence rule '{rule}': {err}"))
        })?
        .build(to_evaluator(start))
        .map_err(|err| {
            RecurrenceError::MalformedEvent(format!("invalid recurrence rule '{rule}': {err}"))
        })?;

    let until = rule
        .until
        .as_ref()
        .map(|until| conform_until(until, start, reference));
    let unbounded = rule.is_unbounded();

    let mut candidates = Vec::new();
    for instance in rrule_set.into_iter() {
        let candidate = from_evaluator(&instance, start);
        if let Some(until) = &until {
            if candidate.key() > until.key() {
                break;
            }
        }
        if unbounded && candidate.year() > horizon_year {
            tracing::debug!(
                horizon_year,
                generated = candidates.len(),
                rule = %rule,
                "unbounded recurrence rule truncated at horizon"
            );
            break;
        }
        candidates.push(candidate);
    }

    Ok(candidates)
}

// ── Evaluator clock ─────────────────────────────────────────────────────

/// Dates and floating times run on UTC, which has no transitions, so the
/// evaluator's arithmetic stays naive. Instants run in their own zone.
fn to_evaluator(start: &ResolvedValue) -> DateTime<rrule::Tz> {
    match start {
        ResolvedValue::Instant(instant) => {
            instant.with_timezone(&rrule::Tz::Tz(instant.timezone()))
        }
        ResolvedValue::Date(_) | ResolvedValue::Floating(_) => {
            start.wall_clock().and_utc().with_timezone(&rrule::Tz::UTC)
        }
    }
}

fn from_evaluator(instance: &DateTime<rrule::Tz>, start: &ResolvedValue) -> ResolvedValue {
    match start {
        ResolvedValue::Date(_) => ResolvedValue::Date(instance.naive_utc().date()),
        ResolvedValue::Floating(_) => ResolvedValue::Floating(instance.naive_utc()),
        ResolvedValue::Instant(instant) => {
            ResolvedValue::Instant(instance.with_timezone(&instant.timezone()))
        }
    }
}
