use tracing::debug;

use crate::errors::AggregationError;

/// Power-of-ten multipliers for magnitude suffixes, indexed by suffix.
const MAGNITUDE_SUFFIXES: [(char, f64); 4] = [('K', 1e3), ('M', 1e6), ('B', 1e9), ('T', 1e12)];

fn magnitude_multiplier(value: &str) -> f64 {
    value
        .chars()
        .last()
        .map(|c| c.to_ascii_uppercase())
        .and_then(|suffix| {
            MAGNITUDE_SUFFIXES
                .iter()
                .find(|(s, _)| *s == suffix)
                .map(|(_, multiplier)| *multiplier)
        })
        .unwrap_or(1.0)
}

/// Parse a reported numeric value, keeping only digits, the first decimal
/// point and a leading minus sign. A trailing K/M/B/T suffix is expanded.
pub fn try_parse_metric(value: &str) -> Result<f64, AggregationError> {
    let trimmed = value.trim();
    let multiplier = magnitude_multiplier(trimmed);

    let mut cleaned = String::with_capacity(trimmed.len());
    let mut seen_point = false;
    for c in trimmed.chars() {
        match c {
            '0'..='9' => cleaned.push(c),
            '.' if !seen_point => {
                seen_point = true;
                cleaned.push(c);
            }
            '-' if cleaned.is_empty() => cleaned.push(c),
            _ => {}
        }
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .map(|number| number * multiplier)
        .ok_or_else(|| AggregationError(value.to_string()))
}

/// Tolerant variant of [`try_parse_metric`]: malformed input reads as zero.
pub fn parse_metric(value: &str) -> f64 {
    try_parse_metric(value).unwrap_or_else(|e| {
        debug!("{}, treating as 0", e);
        0.0
    })
}

/// Human readable rendering of large amounts, e.g. `2.50B`.
pub fn format_human(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e12 {
        format!("{:.2}T", value / 1e12)
    } else if magnitude >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if magnitude >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if magnitude >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        value.to_string()
    }
}

/// Strictly positive, finite values only.
pub fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}
