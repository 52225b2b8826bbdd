//! Exclusion filtering: drop every candidate an `EXDATE` names.

use std::collections::HashSet;

use chrono_tz::Tz;

use crate::normalize::{conform, ResolvedValue};
use crate::value::TemporalValue;

/// Remove the candidates matched by `exclusion_dates`.
///
/// Each exclusion is first brought into the class of `start`, so a UTC
/// `EXDATE` removes the zoned instance at the same instant and a date
/// `EXDATE` removes the timed instance on that day at the start's time.
/// Exclusions matching no candidate are ignored. Order is preserved.
pub fn filter(
    candidates: Vec<ResolvedValue>,
    exclusion_dates: &[TemporalValue],
    start: &ResolvedValue,
    reference: Tz,
) -> Vec<ResolvedValue> {
    if exclusion_dates.is_empty() {
        return candidates;
    }

    let excluded: HashSet<_> = exclusion_dates
        .iter()
        .map(|value| conform(value, start, reference).key())
        .collect();

    candidates
        .into_iter()
        .filter(|candidate| !excluded.contains(&candidate.key()))
        .collect()
}
