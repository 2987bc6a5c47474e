//! Race-timing string parser (`"1:23.456"` or `"23.456"` → seconds).

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::helpers::dec_to_f64;

/// Why a timing string could not be converted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("no duration given")]
    Missing,
    #[error("malformed duration '{0}'")]
    Malformed(String),
}

/// Parse an elapsed-time token into seconds.
///
/// With a colon, the token is split once on the first colon into integer
/// minutes and decimal seconds; without one, the whole token is decimal
/// seconds. The sum is computed exactly and rounded to `f64` once.
///
/// Only plain decimal notation is accepted; exponent forms such as
/// `"2.31e1"` are malformed. Timing sources never publish them.
pub fn parse_duration(raw: Option<&str>) -> Result<f64, DurationError> {
    let token = raw.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(DurationError::Missing);
    }
    let malformed = || DurationError::Malformed(token.to_string());

    let total = match token.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: i64 = minutes.trim().parse().map_err(|_| malformed())?;
            let seconds = Decimal::from_str(seconds.trim()).map_err(|_| malformed())?;
            Decimal::from(minutes)
                .checked_mul(Decimal::from(60))
                .and_then(|m| m.checked_add(seconds))
                .ok_or_else(malformed)?
        }
        None => Decimal::from_str(token).map_err(|_| malformed())?,
    };

    dec_to_f64(total).ok_or_else(malformed)
}
