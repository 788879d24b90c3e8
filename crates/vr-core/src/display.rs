//! Human-readable formatting for list output

use chrono::{DateTime, Utc};

/// Format a ringgit amount with thousands separators and no fraction digits.
/// Non-finite amounts render as `RM -`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "RM -".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-RM {}", grouped)
    } else {
        format!("RM {}", grouped)
    }
}

/// Short day-month-year form, e.g. `15 Jan 2026`.
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%-d %b %Y").to_string()
}
