//! Occurrence materialization: candidate starts become start/end pairs.

use chrono::Duration;
use chrono_tz::Tz;

use crate::error::{RecurrenceError, Result};
use crate::event::Occurrence;
use crate::normalize::ResolvedValue;
use crate::value::TemporalValue;

/// Attach `duration` to every candidate start.
///
/// All-day candidates advance by whole days, floating candidates by naive
/// wall-clock arithmetic, and instants by elapsed time. Instants are then
/// expressed in `reference`, the caller's zone.
///
/// # Errors
///
/// Returns [`RecurrenceError::MalformedEvent`] if an end falls outside the
/// representable date range. No partial result is returned.
pub fn materialize(
    candidates: &[ResolvedValue],
    duration: Duration,
    reference: Tz,
) -> Result<Vec<Occurrence>> {
    candidates
        .iter()
        .map(|candidate| -> Result<Occurrence> {
            let occurrence = match candidate {
                ResolvedValue::Date(date) => Occurrence {
                    start: TemporalValue::Date(*date),
                    end: TemporalValue::Date(
                        date.checked_add_signed(Duration::days(duration.num_days()))
                            .ok_or_else(|| out_of_range(candidate))?,
                    ),
                },
                ResolvedValue::Floating(local) => Occurrence {
                    start: TemporalValue::Floating(*local),
                    end: TemporalValue::Floating(
                        local
                            .checked_add_signed(duration)
                            .ok_or_else(|| out_of_range(candidate))?,
                    ),
                },
                ResolvedValue::Instant(instant) => {
                    let end = instant
                        .checked_add_signed(duration)
                        .ok_or_else(|| out_of_range(candidate))?;
                    Occurrence {
                        start: TemporalValue::from_instant(instant, reference),
                        end: TemporalValue::from_instant(&end, reference),
                    }
                }
            };
            Ok(occurrence)
        })
        .collect()
}

fn out_of_range(candidate: &ResolvedValue) -> RecurrenceError {
    RecurrenceError::MalformedEvent(format!(
        "end of occurrence at {} is out of range",
        candidate.wall_clock()
    ))
}
