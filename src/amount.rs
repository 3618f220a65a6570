use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Digits, optionally grouped by `.`/`,`, with an optional trailing fraction.
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:[.,][0-9]{1,3})*(?:[.,][0-9]+)?").unwrap());
static NOT_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.,-]").unwrap());
static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").unwrap()
});

/// An untyped amount as found in source data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    Number(f64),
    Text(&'a str),
    Absent,
}

impl<'a> From<&'a str> for RawValue<'a> {
    fn from(s: &'a str) -> Self {
        RawValue::Text(s)
    }
}

impl<'a> From<Option<&'a Value>> for RawValue<'a> {
    fn from(v: Option<&'a Value>) -> Self {
        match v {
            Some(Value::Number(n)) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Absent),
            Some(Value::String(s)) => RawValue::Text(s),
            _ => RawValue::Absent,
        }
    }
}

/// Extracts the most plausible monetary figure from `raw`.
///
/// Never fails: anything without a usable number comes back as `0.0`.
/// Handles both `1.234,56` and `1,234.56` by treating whichever separator
/// occurs last as the decimal point.
pub fn extract_amount(raw: RawValue<'_>) -> f64 {
    let text = match raw {
        RawValue::Number(n) => return if n.is_finite() { n } else { 0.0 },
        RawValue::Absent => return 0.0,
        RawValue::Text(t) => t,
    };
    if text.trim().is_empty() {
        return 0.0;
    }

    let candidate = match longest_number(text) {
        Some(m) => m.to_string(),
        None => {
            let compact: String = text.split_whitespace().collect();
            NOT_NUMERIC.replace_all(&compact, "").into_owned()
        }
    };

    parse_float_prefix(&normalize_separators(&candidate))
}

/// Longest number-like run; ties go to the earliest.
fn longest_number(text: &str) -> Option<&str> {
    NUMBER_RE.find_iter(text).fold(None, |best: Option<&str>, m| match best {
        Some(b) if b.len() >= m.as_str().len() => Some(b),
        _ => Some(m.as_str()),
    })
}

fn normalize_separators(s: &str) -> String {
    match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if dot < comma => s.replace('.', "").replacen(',', ".", 1),
        (Some(_), Some(_)) => s.replace(',', ""),
        (None, Some(_)) => s.replacen(',', ".", 1),
        (Some(_), None) => {
            let parts: Vec<&str> = s.split('.').collect();
            match parts.split_last() {
                Some((last, init)) if init.len() > 1 => format!("{}.{}", init.concat(), last),
                _ => s.to_string(),
            }
        }
        (None, None) => s.to_string(),
    }
}

/// Leading float of `s`, ignoring trailing garbage. Non-finite or missing → 0.
fn parse_float_prefix(s: &str) -> f64 {
    FLOAT_PREFIX
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// pt-BR rendering: `.` groups thousands, `,` separates decimals.
pub fn format_brl(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped},{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn amt(s: &str) -> f64 {
        extract_amount(RawValue::Text(s))
    }

    #[test]
    fn test_single_separator_is_decimal() {
        assert_eq!(amt("1234,56"), 1234.56);
        assert_eq!(amt("1234.56"), 1234.56);
        assert_eq!(amt("1.234"), 1.234);
    }

    #[test]
    fn test_later_separator_wins() {
        assert_eq!(amt("1.234,56"), 1234.56);
        assert_eq!(amt("1,234.56"), 1234.56);
        assert_eq!(amt("R$ 12.345.678,90"), 12345678.9);
    }

    #[test]
    fn test_repeated_dots_are_thousands() {
        // The last dot is kept as the decimal point.
        assert_eq!(amt("1.234.567"), 1234.567);
        assert_eq!(amt("1.234.567.5"), 1234567.5);
    }

    #[test]
    fn test_repeated_commas_keep_first_as_decimal() {
        // Only the first comma becomes a point; the float stops at the next one.
        assert_eq!(amt("1,234,567"), 1.234);
    }

    #[test]
    fn test_longest_match_wins() {
        assert_eq!(amt("Lote 3 - R$ 1.250,00"), 1250.0);
        assert_eq!(amt("2 unidades por 15,90 cada"), 15.9);
        // Equal length: the first one is kept.
        assert_eq!(amt("12 e 34"), 12.0);
    }

    #[test]
    fn test_total_on_garbage() {
        assert_eq!(extract_amount(RawValue::Absent), 0.0);
        assert_eq!(amt(""), 0.0);
        assert_eq!(amt("   "), 0.0);
        assert_eq!(amt("abc"), 0.0);
        assert_eq!(amt("R$ -,-"), 0.0);
    }

    #[test]
    fn test_numeric_passthrough() {
        assert_eq!(extract_amount(RawValue::Number(99.5)), 99.5);
        assert_eq!(extract_amount(RawValue::Number(f64::NAN)), 0.0);
        assert_eq!(extract_amount(RawValue::from(Some(&json!(1250)))), 1250.0);
        assert_eq!(extract_amount(RawValue::from(Some(&json!("1.250,00")))), 1250.0);
        assert_eq!(extract_amount(RawValue::from(Some(&json!(null)))), 0.0);
        assert_eq!(extract_amount(RawValue::from(None)), 0.0);
    }

    #[test]
    fn test_reparse_formatted_output() {
        for v in [0.5, 15.9, 1250.0, 1234.56, 987654.321] {
            assert_eq!(amt(&v.to_string()), v);
            let brl = format_brl(v, 3);
            assert!((amt(&format!("R$ {brl}")) - v).abs() < 1e-9, "{brl}");
        }
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(1250.0, 3), "1.250,000");
        assert_eq!(format_brl(0.0, 3), "0,000");
        assert_eq!(format_brl(1234567.891, 2), "1.234.567,89");
        assert_eq!(format_brl(999.0, 0), "999");
        assert_eq!(format_brl(-1500.5, 2), "-1.500,50");
    }
}
