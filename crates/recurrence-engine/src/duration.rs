//! ISO 8601 / RFC 5545 duration literals (`P1D`, `PT1H30M`, `-P1W`).

use chrono::Duration;

use crate::error::{RecurrenceError, Result};

/// Parse a `DURATION` value.
///
/// Accepts an optional sign, then `P`, then week/day components, then an
/// optional `T` followed by hour/minute/second components.
///
/// # Errors
///
/// Returns [`RecurrenceError::MalformedEvent`] for anything else.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1i64, &s[1..]),
        Some(b'-') => (-1i64, &s[1..]),
        _ => (1i64, s),
    };

    let rest = rest
        .strip_prefix(['P', 'p'])
        .ok_or_else(|| malformed(s, "duration must start with 'P'"))?;

    let mut total_seconds: i64 = 0;
    let mut num_buf = String::new();
    let mut in_time = false;
    let mut found_any = false;
    let mut found_time = false;

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
            continue;
        }

        if ch.eq_ignore_ascii_case(&'T') {
            if in_time || !num_buf.is_empty() {
                return Err(malformed(s, "misplaced 'T'"));
            }
            in_time = true;
            continue;
        }

        if num_buf.is_empty() {
            return Err(malformed(s, &format!("expected number before '{ch}'")));
        }
        let n: i64 = num_buf
            .parse()
            .map_err(|_| malformed(s, "component out of range"))?;
        num_buf.clear();
        found_any = true;
        found_time |= in_time;

        let unit = match (ch.to_ascii_uppercase(), in_time) {
            ('W', false) => 7 * 86_400,
            ('D', false) => 86_400,
            ('H', true) => 3_600,
            ('M', true) => 60,
            ('S', true) => 1,
            _ => return Err(malformed(s, &format!("unexpected unit '{ch}'"))),
        };
        total_seconds = n
            .checked_mul(unit)
            .and_then(|secs| total_seconds.checked_add(secs))
            .ok_or_else(|| malformed(s, "duration out of range"))?;
    }

    if !num_buf.is_empty() {
        return Err(malformed(s, "number without unit"));
    }
    if !found_any || (in_time && !found_time) {
        return Err(malformed(s, "no components"));
    }

    Duration::try_seconds(sign * total_seconds)
        .ok_or_else(|| malformed(s, "duration out of range"))
}

/// Render a duration as an RFC 5545 literal, e.g. `P1D`, `PT2H`, `-PT30M`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let mut out = String::new();
    if total < 0 {
        out.push('-');
    }
    out.push('P');

    let abs = total.unsigned_abs();
    let days = abs / 86_400;
    let hours = (abs % 86_400) / 3_600;
    let minutes = (abs % 3_600) / 60;
    let seconds = abs % 60;

    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || (hours == 0 && minutes == 0) {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}

fn malformed(s: &str, reason: &str) -> RecurrenceError {
    RecurrenceError::MalformedEvent(format!("invalid duration '{s}': {reason}"))
}
