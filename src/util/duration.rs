use std::time::Duration;
use thiserror::Error;

/// Errors produced while parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    /// The string is empty or does not follow `<number><unit>` groups.
    #[error("Invalid duration {0:?}")]
    Invalid(String),
    /// A number was not followed by a unit.
    #[error("Missing unit in duration {0:?}")]
    MissingUnit(String),
    /// The unit is not one of `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`.
    #[error("Unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    /// The total does not fit in 64 bits of nanoseconds.
    #[error("Duration out of range: {0:?}")]
    Overflow(String),
    /// A leading `-` on a non-zero duration.
    #[error("Negative duration not allowed: {0:?}")]
    Negative(String),
}

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Fraction digits beyond this are ignored (they are below nanosecond precision).
const MAX_FRACTION_DIGITS: u32 = 18;

fn unit_nanos(unit: &str) -> Option<u64> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parses a duration written as a sequence of `<decimal><unit>` groups.
///
/// Accepts the same shape as the interval strings in the config file:
/// `"0h15m"`, `"1h30m"`, `"1.5h"`, `"300ms"`, `"2h45m30.5s"`. The bare string
/// `"0"` is zero. A leading `+` is allowed; a leading `-` is only accepted
/// when the result is zero, since a [`Duration`] cannot be negative.
///
/// # Examples
///
/// ```
/// use feedbell::util::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("0h15m").unwrap(), Duration::from_secs(900));
/// assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
/// assert!(parse_duration("15").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::Invalid(input.to_string());

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let first = rest.as_bytes()[0];
        if !(first == b'.' || first.is_ascii_digit()) {
            return Err(invalid());
        }

        // Integer part
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let int_digits = &rest[..int_len];
        rest = &rest[int_len..];

        // Fractional part
        let mut frac_digits = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            frac_digits = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
            if int_digits.is_empty() && frac_digits.is_empty() {
                return Err(invalid());
            }
        } else if int_digits.is_empty() {
            return Err(invalid());
        }

        // Unit runs until the next number starts
        let unit_len = rest
            .char_indices()
            .find(|(_, c)| *c == '.' || c.is_ascii_digit())
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let overflow = || DurationError::Overflow(input.to_string());
        let whole: u64 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().map_err(|_| overflow())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(overflow)?;
        nanos = nanos
            .checked_add(fraction_nanos(frac_digits, scale))
            .ok_or_else(overflow)?;
        total = total.checked_add(nanos).ok_or_else(overflow)?;
    }

    if negative && total != 0 {
        return Err(DurationError::Negative(input.to_string()));
    }

    Ok(Duration::from_nanos(total))
}

fn fraction_nanos(digits: &str, scale: u64) -> u64 {
    let mut numerator: u64 = 0;
    let mut denominator: u64 = 1;
    for b in digits.bytes().take(MAX_FRACTION_DIGITS as usize) {
        numerator = numerator * 10 + u64::from(b - b'0');
        denominator *= 10;
    }
    ((u128::from(numerator) * u128::from(scale)) / u128::from(denominator)) as u64
}
