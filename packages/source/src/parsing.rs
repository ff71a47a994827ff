//! Shared parsing utilities for numeric and coordinate cells.

/// Parses a numeric cell, accepting thousands separators and padding
/// (`" 1,234.5 "`). Returns `None` for empty, unparsable, or non-finite
/// values.
#[must_use]
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an x/y pair from optional string cells. Returns `None` if
/// either is missing, unparseable, or zero (a common "no coordinate"
/// sentinel in transit-stop extracts).
#[must_use]
pub fn parse_xy_str(x: Option<&str>, y: Option<&str>) -> Option<(f64, f64)> {
    let x = parse_number(x?)?;
    let y = parse_number(y?)?;
    parse_xy_f64(Some(x), Some(y))
}

/// Parses an x/y pair from optional f64 fields. Returns `None` if missing,
/// non-finite, or zero.
#[must_use]
pub fn parse_xy_f64(x: Option<f64>, y: Option<f64>) -> Option<(f64, f64)> {
    let x = x?;
    let y = y?;
    if x == 0.0 || y == 0.0 || !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some((x, y))
}
