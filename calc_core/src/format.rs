//! Display formatting for calculator values.
//!
//! Numbers get thousand separators and at most ten decimals with trailing
//! zeros trimmed; currencies are shown with two decimals; dates are rendered
//! in the timezone stored in the value's unit.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::value::{CalculatorValue, ValueType};

impl fmt::Display for CalculatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_error() {
            return write!(f, "Error: {}", self.error_msg().unwrap_or_default());
        }

        let n = self.number_value();
        match self.value_type() {
            ValueType::Percentage => write!(f, "{}%", format_number(n)),
            ValueType::Currency => write!(f, "{} {}", format_fixed(n, 2), self.unit()),
            ValueType::Temperature => write!(f, "{} °{}", format_number(n), self.unit()),
            ValueType::Date => write!(f, "{}", format_date(n, self.unit())),
            _ if self.has_unit() => write!(f, "{} {}", format_number(n), self.unit()),
            _ => write!(f, "{}", format_number(n)),
        }
    }
}

/// Format a number with thousand separators and up to ten decimals.
///
/// # Example
/// ```
/// use calc_core::format::format_number;
/// assert_eq!(format_number(1234567.0), "1,234,567");
/// assert_eq!(format_number(-0.125), "-0.125");
/// assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
/// ```
pub fn format_number(value: f64) -> String {
    let formatted = format!("{:.10}", value);
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };
    group_thousands(trimmed)
}

/// Format with a fixed number of decimals and thousand separators.
pub fn format_fixed(value: f64, decimals: usize) -> String {
    group_thousands(&format!("{:.*}", decimals, value))
}

fn group_thousands(text: &str) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, frac_part) = match unsigned.find('.') {
        Some(dot) => unsigned.split_at(dot),
        None => (unsigned, ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // "-0" after rounding reads as zero
    let sign = if grouped.chars().all(|c| c == '0' || c == ',') && frac_part.trim_start_matches('.').chars().all(|c| c == '0') {
        ""
    } else {
        sign
    };
    format!("{}{}{}", sign, grouped, frac_part)
}

/// Render Unix seconds in the named timezone, falling back to UTC.
pub fn format_date(unix_seconds: f64, timezone: &str) -> String {
    let millis = (unix_seconds * 1000.0).round() as i64;
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(millis) else {
        return format_number(unix_seconds);
    };
    match timezone.parse::<Tz>() {
        Ok(tz) => utc.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        Err(_) => utc.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(1000.0), "1,000");
        assert_eq!(format_number(-1234.5), "-1,234.5");
        assert_eq!(format_number(-0.00000000001), "0");
    }

    #[test]
    fn test_display_by_type() {
        assert_eq!(CalculatorValue::number(2.5).to_string(), "2.5");
        assert_eq!(CalculatorValue::new(5.0, "USD", ValueType::Currency).to_string(), "5.00 USD");
        assert_eq!(CalculatorValue::percentage(15.0).to_string(), "15%");
        assert_eq!(CalculatorValue::new(3.048, "m", ValueType::Unit).to_string(), "3.048 m");
        assert_eq!(CalculatorValue::new(20.0, "C", ValueType::Temperature).to_string(), "20 °C");
        assert_eq!(CalculatorValue::error("division by zero").to_string(), "Error: division by zero");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(0.0, "UTC"), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_date(0.0, "Europe/Berlin"), "1970-01-01 01:00:00 CET");
        assert_eq!(format_date(0.0, "Not/AZone"), "1970-01-01 00:00:00 UTC");
    }
}
