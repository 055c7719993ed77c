//! Field normalization shared by all source parsers

use crate::error::FetchError;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Formats tried in order after the ISO forms
const DATE_FORMATS: [&str; 6] = [
    "%m/%d/%Y",
    "%A, %B %d, %Y",
    "%a, %b %d, %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%A, %b %d, %Y",
];

fn leading_int_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(\d[\d,]*)").expect("static regex"))
}

fn any_int_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// Normalize a source date string to a calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDThh:mm:ss` (any time suffix is dropped),
/// `MM/DD/YYYY`, and long forms like `Saturday, April 5, 2025`. An
/// unparseable date is a parse error; it is never replaced by today.
pub fn parse_draw_date(text: &str) -> Result<NaiveDate, FetchError> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Err(FetchError::parse("empty draw date"));
    }

    let iso = text.split('T').next().unwrap_or(&text);
    if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        return Ok(date);
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
        .ok_or_else(|| FetchError::parse(format!("unrecognized draw date: {:?}", text)))
}

/// Parse a jackpot string such as `$1.5 Million` or `$312,000,000`.
///
/// Jackpot is non-critical metadata: anything unparseable degrades to 0.
pub fn parse_currency(text: &str) -> f64 {
    let cleaned = text.replace(['$', ','], "");
    let lower = cleaned.trim().to_ascii_lowercase();

    let (number, multiplier) = if let Some(rest) = lower.strip_suffix("billion") {
        (rest, 1e9)
    } else if let Some(rest) = lower.strip_suffix("million") {
        (rest, 1e6)
    } else {
        (lower.as_str(), 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => (v * multiplier * 100.0).round() / 100.0,
        _ => 0.0,
    }
}

/// `$1,234,567` style amount
pub fn format_usd(amount: f64) -> String {
    let whole = amount.round() as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${}", out)
}

/// Parse a jackpot winner count.
///
/// Accepts a bare integer, the literal `None`, or free text starting with an
/// integer (`"2 Winners"`). Anything else degrades to 0.
pub fn parse_winners(text: &str) -> u32 {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return 0;
    }

    leading_int_pattern()
        .captures(trimmed)
        .and_then(|caps| caps[1].replace(',', "").parse().ok())
        .unwrap_or(0)
}

/// First integer anywhere in the text (`"Draw #1203"` -> 1203)
pub fn extract_int(text: &str) -> Option<u32> {
    any_int_pattern()
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Split the numeric values read from a payload into white balls and the
/// powerball.
///
/// The first five values are the white balls and the sixth is the powerball.
/// Fewer than six values is a parse error; extra trailing values (such as
/// a Power Play multiplier) are ignored.
pub fn split_numbers(values: &[u32]) -> Result<(Vec<u32>, u32), FetchError> {
    if values.len() < 6 {
        return Err(FetchError::parse(format!(
            "expected 6 drawn numbers, found {}",
            values.len()
        )));
    }
    Ok((values[..5].to_vec(), values[5]))
}
