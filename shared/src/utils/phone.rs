//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

// International phone number regex (E.164 format)
static E164_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").unwrap()
});

/// Normalize a phone number by removing common formatting characters
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Check if a phone number is valid E.164 once normalized
pub fn is_valid_international_phone(phone: &str) -> bool {
    E164_REGEX.is_match(&normalize_phone_number(phone))
}

/// Mask a destination for logs and responses, keeping the last four digits
///
/// `+15551234567` becomes `+1******4567`. Anything too short to mask
/// meaningfully collapses to `****`.
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    let digits = normalized.trim_start_matches('+');
    if digits.len() < 7 {
        return "****".to_string();
    }

    let prefix = if normalized.starts_with('+') { "+" } else { "" };
    format!(
        "{}{}{}{}",
        prefix,
        &digits[..1],
        "*".repeat(digits.len() - 5),
        &digits[digits.len() - 4..]
    )
}
