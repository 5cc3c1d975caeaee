//! Canonical euro formatting for free-text prize values.
//!
//! Two decimals are produced the way a browser's `toFixed(2)` does: values
//! that sit exactly halfway between two cents round up. Magnitudes of `1e21`
//! and above keep their full digit expansion (`"1000000000000000000000,00 €"`)
//! where a browser would switch to exponent notation.

const EURO_SUFFIX: &str = " €";

/// Formats a free-text value as `"12,50 €"`.
///
/// Text that already names a currency, or that holds no parseable number,
/// is returned unchanged. Applying the function twice yields the same result
/// as applying it once.
pub fn format_value(raw: &str) -> String {
    if has_currency_marker(raw) {
        return raw.to_string();
    }

    let Some(run) = first_numeric_run(raw) else {
        return raw.to_string();
    };

    match parse_leading_number(&run.replace(',', ".")) {
        Some(value) => format!("{}{EURO_SUFFIX}", two_decimals(value).replace('.', ",")),
        None => raw.to_string(),
    }
}

fn two_decimals(value: f64) -> String {
    if is_cent_tie(value) {
        format!("{:.2}", (value * 100.0).ceil() / 100.0)
    } else {
        format!("{value:.2}")
    }
}

/// A non-negative float lies exactly on a half cent only when its fraction is
/// an odd number of eighths (`.125`, `.375`, `.625`, `.875`).
fn is_cent_tie(value: f64) -> bool {
    let eighths = value.fract() * 8.0;
    eighths.fract() == 0.0 && (eighths as u8) % 2 == 1
}

fn has_currency_marker(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    lower.contains('€') || lower.contains("euro")
}

fn first_numeric_run(raw: &str) -> Option<&str> {
    let is_numeric = |c: char| c.is_ascii_digit() || c == '.' || c == ',';
    let start = raw.find(is_numeric)?;
    let rest = &raw[start..];
    let end = rest.find(|c: char| !is_numeric(c)).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Parses the longest `digits[.digits]` prefix, the way a lenient float
/// reader would: `"1.234.5"` reads as `1.234`.
fn parse_leading_number(text: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_point = false;

    for (idx, c) in text.char_indices() {
        if c.is_ascii_digit() {
            seen_digit = true;
        } else if c == '.' && !seen_point {
            seen_point = true;
        } else {
            break;
        }
        end = idx + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }
    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
