use std::sync::LazyLock;

use regex::Regex;

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^1[3-9][0-9]{9}$").expect("valid regex"));
static LANDLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0[0-9]{2,3}-?[0-9]{7,8}$").expect("valid regex"));

/// Whether `phone` is an 11-digit mainland mobile number.
pub fn is_valid_mobile(phone: &str) -> bool {
    MOBILE_RE.is_match(phone)
}

/// Mobile number or landline with area code (`010-12345678`, `075512345678`).
pub fn is_valid_contact_phone(phone: &str) -> bool {
    is_valid_mobile(phone) || LANDLINE_RE.is_match(phone)
}

/// Strip spaces, dashes and an optional `+86` / `86` country prefix.
pub fn normalize_mobile(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = digits.strip_prefix('+').unwrap_or(&digits);
    match digits.strip_prefix("86") {
        Some(rest) if rest.len() == 11 => rest.to_string(),
        _ => digits.to_string(),
    }
}

/// `13812345678` -> `138****5678`, for log lines.
pub fn mask(phone: &str) -> String {
    if phone.len() == 11 && phone.is_ascii() {
        format!("{}****{}", &phone[..3], &phone[7..])
    } else {
        "***".to_string()
    }
}
