//! Display rules for record values: placeholders, dates, grouped numbers
//! and currency.

use chrono::{Datelike, NaiveDateTime};

pub const MISSING: &str = "-";
pub const NOT_AVAILABLE: &str = "NA";
pub const CURRENCY_PREFIX: &str = "RS. ";

const DATE_FORMAT: &str = "%d-%m-%Y";
const SHORT_DATE_FORMAT: &str = "%d-%m-%y";
const TIMESTAMP_FORMAT: &str = "%-d %b %Y %-I:%M:%S %p";

// Upstream systems write 0001-01-01 and 1800-01-01 for "never set".
const SENTINEL_YEAR_LIMIT: i32 = 1900;

/// Trimmed text, or `None` when absent or blank.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn text_or(value: Option<&str>, placeholder: &str) -> String {
    present(value).unwrap_or(placeholder).to_string()
}

pub fn text(value: Option<&str>) -> String {
    text_or(value, MISSING)
}

pub fn meaningful_date(value: Option<NaiveDateTime>) -> Option<NaiveDateTime> {
    value.filter(|v| v.year() >= SENTINEL_YEAR_LIMIT)
}

pub fn date(value: Option<NaiveDateTime>) -> Option<String> {
    meaningful_date(value).map(|v| v.format(DATE_FORMAT).to_string())
}

pub fn date_or(value: Option<NaiveDateTime>, placeholder: &str) -> String {
    date(value).unwrap_or_else(|| placeholder.to_string())
}

pub fn short_date_or(value: Option<NaiveDateTime>, placeholder: &str) -> String {
    meaningful_date(value)
        .map(|v| v.format(SHORT_DATE_FORMAT).to_string())
        .unwrap_or_else(|| placeholder.to_string())
}

pub fn timestamp(value: Option<NaiveDateTime>) -> Option<String> {
    meaningful_date(value).map(|v| v.format(TIMESTAMP_FORMAT).to_string())
}

pub fn bool_text(value: Option<bool>) -> String {
    match value {
        Some(true) => "True".to_string(),
        Some(false) => "False".to_string(),
        None => MISSING.to_string(),
    }
}

/// Whole number with comma thousands separators, rounded half away from
/// zero.
pub fn grouped(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative && out != "0" {
        out.insert(0, '-');
    }
    out
}

/// Valuation amount as printed on the banner and rating bar.
pub fn valuation_amount(value: Option<f64>) -> String {
    match value {
        Some(amount) if amount.is_finite() => {
            format!("{}{}/-", CURRENCY_PREFIX, grouped(amount))
        }
        _ => MISSING.to_string(),
    }
}

pub fn insured_value(value: Option<f64>) -> String {
    match value {
        Some(amount) if amount.is_finite() => format!("{}{}", CURRENCY_PREFIX, grouped(amount)),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_datetime;

    #[test]
    fn valuation_amount_groups_thousands() {
        assert_eq!(valuation_amount(Some(40000.0)), "RS. 40,000/-");
        assert_eq!(valuation_amount(Some(1234567.5)), "RS. 1,234,568/-");
        assert_eq!(valuation_amount(Some(999.0)), "RS. 999/-");
        assert_eq!(valuation_amount(None), "-");
    }

    #[test]
    fn grouped_handles_sign_and_rounding() {
        assert_eq!(grouped(0.4), "0");
        assert_eq!(grouped(-0.4), "0");
        assert_eq!(grouped(-2500.5), "-2,501");
        assert_eq!(grouped(100000.0), "100,000");
        assert_eq!(grouped(f64::NAN), "0");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        assert_eq!(text(Some("   ")), "-");
        assert_eq!(text(None), "-");
        assert_eq!(text(Some(" Good ")), "Good");
        assert_eq!(text_or(Some(""), NOT_AVAILABLE), "NA");
    }

    #[test]
    fn dates_use_day_month_year() {
        let value = parse_datetime("2025-06-03T06:43:54").expect("date");
        assert_eq!(date(Some(value)).as_deref(), Some("03-06-2025"));
        assert_eq!(short_date_or(Some(value), MISSING), "03-06-25");
        assert_eq!(
            timestamp(Some(value)).as_deref(),
            Some("3 Jun 2025 6:43:54 AM")
        );
    }

    #[test]
    fn sentinel_dates_are_treated_as_missing() {
        let sentinel = parse_datetime("1800-01-01T00:00:00").expect("date");
        assert_eq!(date_or(Some(sentinel), NOT_AVAILABLE), "NA");
        assert_eq!(date_or(None, MISSING), "-");
    }

    #[test]
    fn insured_value_and_flags() {
        assert_eq!(insured_value(Some(52000.0)), "RS. 52,000");
        assert_eq!(insured_value(None), "NA");
        assert_eq!(bool_text(Some(false)), "False");
        assert_eq!(bool_text(None), "-");
    }
}
