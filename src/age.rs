//! # Age Normalizer
//! Turns the relative age text shown next to a listing entry
//! ("3 hours ago", "1 day ago") into a number of minutes.
//!
//! Unknown units and non-numeric magnitudes normalize to `0.0` instead of
//! failing, so one odd entry cannot abort a whole comparison run.

const MINUTES_PER_HOUR: f64 = 60.0;
const MINUTES_PER_DAY: f64 = 60.0 * 24.0;
/// 30-day month.
const MINUTES_PER_MONTH: f64 = MINUTES_PER_DAY * 30.0;
/// 365-day year.
const MINUTES_PER_YEAR: f64 = MINUTES_PER_DAY * 365.0;

/// Unit prefixes and their multipliers, checked in order.
const UNITS: [(&str, f64); 5] = [
    ("minute", 1.0),
    ("hour", MINUTES_PER_HOUR),
    ("day", MINUTES_PER_DAY),
    ("month", MINUTES_PER_MONTH),
    ("year", MINUTES_PER_YEAR),
];

/// Normalize `"<number> <unit>[s] [ago]"` to minutes.
///
/// The unit is matched case-insensitively by prefix, so both `"hour"` and
/// `"hours"` work. Anything unparsable yields `0.0`.
pub fn normalize(text: &str) -> f64 {
    let mut parts = text.split_whitespace();
    let value = match parts.next().and_then(|v| v.parse::<f64>().ok()) {
        Some(v) if v.is_finite() => v,
        _ => {
            tracing::info!(age = text, "age text has no numeric magnitude, using 0");
            return 0.0;
        }
    };

    let unit = parts.next().unwrap_or_default().to_ascii_lowercase();
    match UNITS.iter().find(|(prefix, _)| unit.starts_with(prefix)) {
        Some((_, multiplier)) => value * multiplier,
        None => {
            tracing::info!(age = text, "unrecognized age unit, using 0");
            0.0
        }
    }
}
