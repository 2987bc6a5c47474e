//! Shared helpers for decimal conversion and source date/time parsing.
//!
//! Timing strings are summed in `Decimal` and converted to `f64` once, via
//! the shortest decimal representation, so `60 + 23.456` lands on the same
//! `f64` as the literal `83.456`.
//!
//! Dates from the race source are ISO (`YYYY-MM-DD`) but hand-edited inputs
//! have been seen as `DD-MM-YYYY` and `MM-DD-YYYY`; all three are accepted.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

/// Date layouts accepted from sources, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%m-%d-%Y"];

/// Time-of-day layouts accepted from sources, tried in order.
const TIME_FORMATS: [&str; 3] = ["%H:%M:%SZ", "%H:%M:%S", "%H:%M"];

/// Convert a Decimal to the nearest f64.
///
/// Goes through the normalized decimal string; `f64::from_str` is correctly
/// rounded, which `Decimal::to_f64` does not guarantee for fractional values.
pub(crate) fn dec_to_f64(d: Decimal) -> Option<f64> {
    d.normalize().to_string().parse().ok()
}

/// Parse a race date in any of the accepted layouts.
pub(crate) fn parse_race_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Parse an optional race start time. `None`, empty strings and the
/// `Unknown` sentinel all mean "no time published".
pub(crate) fn parse_race_time(raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("unknown") {
        return None;
    }
    let parsed = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok());
    if parsed.is_none() {
        tracing::warn!("Unparseable race time '{}', treating as unknown", raw);
    }
    parsed
}

/// Arithmetic mean, `None` for an empty input.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
