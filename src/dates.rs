use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

// D/M/YYYY or DD/MM/YYYY, day first
static RE_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());
// YYYY-MM-DD
static RE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
// Page scan: no word boundary, any date-like run counts.
static RE_DMY_SCAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}/\d{1,2}/\d{4}").unwrap());

/// Extracts a calendar date from free-form text.
///
/// The first `D/M/YYYY` substring wins; otherwise the first ISO
/// `YYYY-MM-DD`. Only one rule is consulted: a day-first match that is not a
/// real date yields `None` without trying ISO. Bare years never count.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = RE_DMY.captures(text) {
        return parse_ymd(&caps[3], &caps[2], &caps[1]);
    }
    if let Some(caps) = RE_ISO.captures(text) {
        return parse_ymd(&caps[1], &caps[2], &caps[3]);
    }
    None
}

fn parse_ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    let y: i32 = y.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    let d: u32 = d.parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Local calendar date, i.e. today at midnight.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// A deadline is still open on its own day.
pub fn is_active(deadline: NaiveDate, today: NaiveDate) -> bool {
    deadline >= today
}

/// All `D/M/YYYY` substrings of `text`, first occurrence order, no repeats.
pub fn scan_date_strings(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    RE_DMY_SCAN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
